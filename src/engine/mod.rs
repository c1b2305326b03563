//! Pagination engine: owns the config and text, recalculates pages on
//! change and publishes snapshots to listeners

mod listeners;
mod state;

pub use listeners::{Listener, ListenerRegistry, SubscriptionId};
pub use state::{EnginePhase, PaginationState};

use crate::error::{PaginationError, Result};
use crate::layout::{paginate_text, ConfigPatch, PaginationConfig, TextMetrics};
use crate::render::PageDiff;
use crate::scheduler::{Clock, Scheduler, SystemClock, TaskHandle};
use std::rc::Rc;

/// Default trailing debounce for content updates
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Quiet period before a debounced content update is laid out
    pub debounce_ms: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Counters describing the engine's work so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Line/page breaking passes actually run
    pub recalculations: u64,
    /// States handed to listeners
    pub publications: u64,
    /// Debounced updates superseded before their timer fired
    pub coalesced: u64,
    /// Results dropped because a newer request arrived
    pub discarded: u64,
}

/// A debounced recalculation waiting for its timer
#[derive(Debug, Clone, Copy)]
struct PendingRecalc {
    handle: TaskHandle,
    generation: u64,
}

/// One editing session's pagination engine.
///
/// Single-threaded: every operation runs to completion before returning, and
/// the only deferred work is the debounce timer, driven by [`poll`](Self::poll).
pub struct PaginationEngine {
    metrics: Box<dyn TextMetrics>,
    scheduler: Scheduler,
    options: EngineOptions,
    phase: EnginePhase,
    config: Option<PaginationConfig>,
    /// Text the current state was computed from
    text: String,
    /// Newest debounced text not laid out yet
    requested_text: Option<String>,
    pending: Option<PendingRecalc>,
    /// Bumped on every request; only the newest result is published
    generation: u64,
    state: Option<Rc<PaginationState>>,
    /// Page explicitly chosen with `navigate_to_page`
    pinned_page: Option<usize>,
    listeners: ListenerRegistry,
    last_diff: PageDiff,
    stats: EngineStats,
}

impl PaginationEngine {
    /// Create an engine driven by the wall clock
    pub fn new(metrics: impl TextMetrics + 'static) -> Self {
        Self::with_options(metrics, SystemClock::new(), EngineOptions::default())
    }

    /// Create an engine with an explicit clock (e.g. a virtual clock in tests)
    pub fn with_options(
        metrics: impl TextMetrics + 'static,
        clock: impl Clock + 'static,
        options: EngineOptions,
    ) -> Self {
        Self {
            metrics: Box::new(metrics),
            scheduler: Scheduler::new(Box::new(clock)),
            options,
            phase: EnginePhase::Uninitialized,
            config: None,
            text: String::new(),
            requested_text: None,
            pending: None,
            generation: 0,
            state: None,
            pinned_page: None,
            listeners: ListenerRegistry::new(),
            last_diff: PageDiff::default(),
            stats: EngineStats::default(),
        }
    }

    /// Lay out `text` under `config` synchronously and publish the result.
    ///
    /// Invalid configs are rejected and the engine keeps its prior state.
    pub fn initialize(&mut self, config: PaginationConfig, text: impl Into<String>) -> Result<()> {
        self.ensure_alive()?;
        config.validate()?;

        self.cancel_pending();
        self.requested_text = None;
        self.config = Some(config);
        self.text = text.into();
        self.pinned_page = None;
        self.generation += 1;
        self.recalculate(self.generation);
        Ok(())
    }

    /// Replace the text.
    ///
    /// With `debounce`, the layout waits for a quiet period and only the last
    /// text of a burst is laid out. Without it, any pending update is dropped
    /// and the layout happens before this returns.
    pub fn update_content(&mut self, text: impl Into<String>, debounce: bool) -> Result<()> {
        self.ensure_ready()?;
        let text = text.into();
        self.generation += 1;

        if !debounce {
            self.cancel_pending();
            self.requested_text = None;
            self.text = text;
            self.recalculate(self.generation);
            return Ok(());
        }

        if let Some(previous) = self.pending.take() {
            self.scheduler.cancel(previous.handle);
            self.stats.coalesced += 1;
            tracing::trace!(generation = previous.generation, "coalesced debounced update");
        }
        self.requested_text = Some(text);
        let handle = self.scheduler.schedule_after(self.options.debounce_ms);
        self.pending = Some(PendingRecalc {
            handle,
            generation: self.generation,
        });

        self.mark_recalculating();
        Ok(())
    }

    /// Merge `patch` into the config and recompute immediately.
    ///
    /// Listeners see the current pages flagged as recalculating first, then
    /// the new layout. A debounced text waiting for its timer is laid out now along with the
    /// new config.
    pub fn update_config(&mut self, patch: &ConfigPatch) -> Result<()> {
        self.ensure_ready()?;
        let config = self
            .config
            .as_ref()
            .ok_or(PaginationError::Uninitialized)?
            .merged(patch);
        config.validate()?;

        self.mark_recalculating();
        self.config = Some(config);
        self.recompute_now();
        Ok(())
    }

    /// Show page `index`; out-of-range indices are ignored.
    ///
    /// The choice sticks across edits and config changes, clamped to the new
    /// page count, until [`follow_end`](Self::follow_end) or `initialize`.
    pub fn navigate_to_page(&mut self, index: usize) -> bool {
        let Some(current) = self.state.clone() else {
            return false;
        };
        if index >= current.total_pages {
            tracing::debug!(index, total = current.total_pages, "ignoring navigation out of range");
            return false;
        }

        self.pinned_page = Some(index);
        if current.current_page_index != index {
            self.publish(current.with_current_page(index));
        }
        true
    }

    /// Drop the page chosen with `navigate_to_page` and show the last page
    /// with visible text again
    pub fn follow_end(&mut self) -> bool {
        self.pinned_page = None;
        let Some(current) = self.state.clone() else {
            return false;
        };
        let index = PaginationState::follow_index(&current.pages);
        if current.current_page_index != index {
            self.publish(current.with_current_page(index));
        }
        true
    }

    /// Whether a page chosen with `navigate_to_page` is being held
    pub fn is_pinned(&self) -> bool {
        self.pinned_page.is_some()
    }

    /// Run the debounced recalculation if its timer has fired
    pub fn poll(&mut self) -> bool {
        if self.phase == EnginePhase::Destroyed {
            return false;
        }

        let mut ran = false;
        for handle in self.scheduler.take_due() {
            match self.pending {
                Some(pending) if pending.handle == handle => {
                    self.pending = None;
                    self.run_pending(pending.generation);
                    ran = true;
                }
                _ => tracing::trace!(?handle, "ignoring stale timer"),
            }
        }
        ran
    }

    /// Lay out a pending debounced update right away (e.g. before export)
    pub fn flush(&mut self) -> Result<bool> {
        self.ensure_ready()?;
        match self.pending.take() {
            Some(pending) => {
                self.scheduler.cancel(pending.handle);
                self.run_pending(pending.generation);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop cached measurements and recompute, after fonts change
    pub fn invalidate_metrics(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.metrics.invalidate();
        self.recompute_now();
        Ok(())
    }

    /// Register a listener; it is called immediately with the current state
    pub fn subscribe<F>(&mut self, listener: F) -> Result<SubscriptionId>
    where
        F: FnMut(&PaginationState) + 'static,
    {
        self.ensure_alive()?;
        Ok(self.listeners.subscribe(listener))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Handle for (un)subscribing from inside listener callbacks
    pub fn listeners(&self) -> ListenerRegistry {
        self.listeners.clone()
    }

    /// Tear down: cancel timers, drop listeners and state
    pub fn destroy(&mut self) {
        if self.phase == EnginePhase::Destroyed {
            return;
        }
        self.scheduler.clear();
        self.pending = None;
        self.requested_text = None;
        self.listeners.clear();
        self.state = None;
        self.text.clear();
        self.phase = EnginePhase::Destroyed;
        tracing::debug!("pagination engine destroyed");
    }

    pub fn state(&self) -> Option<Rc<PaginationState>> {
        self.state.clone()
    }

    pub fn config(&self) -> Option<&PaginationConfig> {
        self.config.as_ref()
    }

    /// Text the published state was computed from
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Debounced text still waiting to be laid out
    pub fn pending_text(&self) -> Option<&str> {
        self.requested_text.as_deref()
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Patches from the previous publication to the current one
    pub fn last_diff(&self) -> &PageDiff {
        &self.last_diff
    }

    /// When the pending debounce timer fires, in clock milliseconds
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    /// Current time of the engine's clock
    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    fn ensure_alive(&self) -> Result<()> {
        match self.phase {
            EnginePhase::Destroyed => Err(PaginationError::Destroyed),
            _ => Ok(()),
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.phase {
            EnginePhase::Uninitialized => Err(PaginationError::Uninitialized),
            EnginePhase::Destroyed => Err(PaginationError::Destroyed),
            EnginePhase::Ready | EnginePhase::Recalculating => Ok(()),
        }
    }

    /// Enter `Recalculating`, telling listeners the shown pages are about to change
    fn mark_recalculating(&mut self) {
        if self.phase != EnginePhase::Ready {
            return;
        }
        self.phase = EnginePhase::Recalculating;
        if let Some(current) = self.state.clone() {
            self.publish(current.recalculating());
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.scheduler.cancel(pending.handle);
        }
    }

    /// Fold any debounced text in and recompute synchronously
    fn recompute_now(&mut self) {
        self.cancel_pending();
        if let Some(text) = self.requested_text.take() {
            self.text = text;
        }
        self.generation += 1;
        self.recalculate(self.generation);
    }

    fn run_pending(&mut self, generation: u64) {
        if generation != self.generation {
            self.stats.discarded += 1;
            tracing::debug!(generation, latest = self.generation, "dropping superseded update");
            return;
        }
        if let Some(text) = self.requested_text.take() {
            self.text = text;
        }
        self.recalculate(generation);
    }

    fn recalculate(&mut self, generation: u64) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        let (pages, budget) = paginate_text(&self.text, config, self.metrics.as_ref());
        self.stats.recalculations += 1;

        if generation != self.generation {
            self.stats.discarded += 1;
            tracing::debug!(generation, latest = self.generation, "discarding stale layout");
            return;
        }

        let current = match self.pinned_page {
            Some(pinned) => {
                let clamped = pinned.min(pages.len().saturating_sub(1));
                self.pinned_page = Some(clamped);
                clamped
            }
            None => PaginationState::follow_index(&pages),
        };

        self.phase = EnginePhase::Ready;
        self.publish(PaginationState::new(pages, current));

        tracing::debug!(
            generation,
            total_pages = self.state.as_ref().map(|s| s.total_pages).unwrap_or(0),
            first_page_lines = budget.first_page,
            lines_per_page = budget.other_pages,
            patches = self.last_diff.patch_count(),
            "published pagination"
        );
    }

    /// Replace the shared state and notify listeners
    fn publish(&mut self, state: PaginationState) {
        let state = Rc::new(state);
        self.last_diff = PageDiff::between(self.generation, self.state.as_deref(), &state);
        self.state = Some(Rc::clone(&state));
        self.stats.publications += 1;
        self.listeners.notify(&state);
    }
}
