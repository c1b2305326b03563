//! WASM bindings for the pagination engine

use crate::engine::{EngineOptions, PaginationEngine, PaginationState, SubscriptionId};
use crate::error::PaginationError;
use crate::layout::{ConfigPatch, FontLibrary, FontMetrics, MemoizedMetrics, PaginationConfig};
use crate::render::PageDiff;
use crate::scheduler::SystemClock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js(err: PaginationError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// WASM-exposed pagination engine.
///
/// Offsets handed to JS are UTF-16 code unit indices so they can be used with
/// `String.prototype.slice` directly.
#[wasm_bindgen]
pub struct WasmPaginator {
    engine: PaginationEngine,
    fonts: Rc<RefCell<FontLibrary>>,
    subscriptions: FxHashMap<u32, SubscriptionId>,
    next_subscription: u32,
}

#[wasm_bindgen]
impl WasmPaginator {
    /// Create and lay out `text` with a JSON config (`"{}"` for defaults)
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, text: &str) -> Result<WasmPaginator, JsValue> {
        let config: PaginationConfig = if config_json.trim().is_empty() {
            PaginationConfig::default()
        } else {
            serde_json::from_str(config_json)
                .map_err(PaginationError::from)
                .map_err(to_js)?
        };

        let fonts = Rc::new(RefCell::new(FontLibrary::new()));
        let metrics = MemoizedMetrics::new(Rc::clone(&fonts));
        let mut engine =
            PaginationEngine::with_options(metrics, SystemClock::new(), EngineOptions::default());
        engine.initialize(config, text).map_err(to_js)?;

        Ok(Self {
            engine,
            fonts,
            subscriptions: FxHashMap::default(),
            next_subscription: 0,
        })
    }

    /// Register per-character advances (in em) for a font family, then
    /// recompute with the new measurements
    #[wasm_bindgen(js_name = setFontMetrics)]
    pub fn set_font_metrics(
        &mut self,
        family: &str,
        char_widths: Vec<f32>,
        default_width: f32,
    ) -> Result<(), JsValue> {
        self.fonts
            .borrow_mut()
            .set(family, FontMetrics::new(char_widths, default_width));
        self.engine.invalidate_metrics().map_err(to_js)
    }

    #[wasm_bindgen(js_name = updateContent)]
    pub fn update_content(&mut self, text: &str, debounce: bool) -> Result<(), JsValue> {
        self.engine.update_content(text, debounce).map_err(to_js)
    }

    /// Merge a partial JSON config
    #[wasm_bindgen(js_name = updateConfig)]
    pub fn update_config(&mut self, patch_json: &str) -> Result<(), JsValue> {
        let patch = ConfigPatch::from_json(patch_json).map_err(to_js)?;
        self.engine.update_config(&patch).map_err(to_js)
    }

    #[wasm_bindgen(js_name = navigateToPage)]
    pub fn navigate_to_page(&mut self, index: usize) -> bool {
        self.engine.navigate_to_page(index)
    }

    /// Go back to following the end of the text
    #[wasm_bindgen(js_name = followEnd)]
    pub fn follow_end(&mut self) -> bool {
        self.engine.follow_end()
    }

    /// Run the debounced recalculation if due; call from a timer or rAF loop
    pub fn poll(&mut self) -> bool {
        self.engine.poll()
    }

    /// Milliseconds until the pending recalculation is due, if any
    #[wasm_bindgen(js_name = msUntilDue)]
    pub fn ms_until_due(&self) -> Option<f64> {
        let deadline = self.engine.next_deadline()?;
        Some(deadline.saturating_sub(self.engine.now_ms()) as f64)
    }

    /// Current state as JSON, or `null` after `destroy`
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<String, JsValue> {
        let state = self.engine.state().map(|state| StateJs::from_state(&state));
        serde_json::to_string(&state)
            .map_err(PaginationError::from)
            .map_err(to_js)
    }

    /// Patches from the previous published state, as JSON
    #[wasm_bindgen(js_name = getLastDiff)]
    pub fn get_last_diff(&self) -> Result<String, JsValue> {
        let diff: &PageDiff = self.engine.last_diff();
        serde_json::to_string(diff)
            .map_err(PaginationError::from)
            .map_err(to_js)
    }

    /// Call `callback(stateJson)` now and after every change.
    ///
    /// Returns an id for `unsubscribe`.
    pub fn subscribe(&mut self, callback: js_sys::Function) -> Result<u32, JsValue> {
        let id = self
            .engine
            .subscribe(move |state| {
                let payload = match serde_json::to_string(&StateJs::from_state(state)) {
                    Ok(json) => JsValue::from_str(&json),
                    Err(err) => {
                        tracing::warn!(%err, "failed to serialize pagination state");
                        return;
                    }
                };
                if let Err(err) = callback.call1(&JsValue::NULL, &payload) {
                    tracing::warn!(?err, "pagination listener threw");
                }
            })
            .map_err(to_js)?;

        self.next_subscription += 1;
        self.subscriptions.insert(self.next_subscription, id);
        Ok(self.next_subscription)
    }

    pub fn unsubscribe(&mut self, id: u32) -> bool {
        match self.subscriptions.remove(&id) {
            Some(subscription) => self.engine.unsubscribe(subscription),
            None => false,
        }
    }

    pub fn destroy(&mut self) {
        self.subscriptions.clear();
        self.engine.destroy();
    }
}

/// Serializable state for JS
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateJs {
    pub pages: Vec<PageJs>,
    pub current_page_index: usize,
    pub total_pages: usize,
    pub is_recalculating: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageJs {
    pub id: usize,
    pub page_number: usize,
    /// UTF-16 offset
    pub start_offset: usize,
    /// UTF-16 offset, exclusive
    pub end_offset: usize,
    pub content: String,
    pub line_count: usize,
    pub is_first_page_of_chapter: bool,
    pub chapter_title: Option<String>,
}

impl StateJs {
    fn from_state(state: &PaginationState) -> Self {
        let mut utf16_offset = 0;
        let pages = state
            .pages
            .iter()
            .map(|page| {
                let start_offset = utf16_offset;
                utf16_offset += page.content.encode_utf16().count();
                PageJs {
                    id: page.id.0,
                    page_number: page.page_number,
                    start_offset,
                    end_offset: utf16_offset,
                    content: page.content.clone(),
                    line_count: page.line_count,
                    is_first_page_of_chapter: page.is_first_page_of_chapter,
                    chapter_title: page.chapter_title.clone(),
                }
            })
            .collect();

        Self {
            pages,
            current_page_index: state.current_page_index,
            total_pages: state.total_pages,
            is_recalculating: state.is_recalculating,
        }
    }
}
