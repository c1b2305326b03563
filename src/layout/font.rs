//! Font metrics for layout

use crate::error::{PaginationError, Result};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use unicode_segmentation::UnicodeSegmentation;

/// Advance of the fallback monospace face, in em
pub const MONOSPACE_ADVANCE_EM: f32 = 0.6;

/// Upper bound on memoized widths before the cache is dropped
pub const DEFAULT_CACHE_CAPACITY: usize = 16 * 1024;

/// Font family plus resolved pixel size
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size_px: f32,
}

impl FontSpec {
    pub fn new(family: &str, size_px: f32) -> Self {
        Self {
            family: family.to_string(),
            size_px,
        }
    }
}

/// Text measurement capability used by the line and page breakers.
///
/// Implementations must be pure: the same text and font always measure the
/// same, so results can be memoized.
pub trait TextMetrics {
    /// Rendered width of `text` in pixels
    fn measure_width(&self, text: &str, font: &FontSpec) -> Result<f32>;

    /// Height of one line of `font` in pixels
    fn line_height_px(&self, font: &FontSpec, multiplier: f32) -> Result<f32>;

    /// Drop any cached measurements (fonts were reloaded)
    fn invalidate(&self) {}
}

/// Per-character advance table, in em units
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    /// Width of ASCII characters (0-127)
    pub char_widths: Vec<f32>,
    /// Default width for non-ASCII characters
    pub default_width: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::monospace()
    }
}

impl FontMetrics {
    pub fn new(char_widths: Vec<f32>, default_width: f32) -> Self {
        Self {
            char_widths,
            default_width,
        }
    }

    /// Uniform advance for every character
    pub fn uniform(advance_em: f32) -> Self {
        Self::new(vec![advance_em; 128], advance_em)
    }

    /// The metric set used when a font cannot be resolved
    pub fn monospace() -> Self {
        Self::uniform(MONOSPACE_ADVANCE_EM)
    }

    /// Get width of a character
    pub fn width(&self, c: char) -> f32 {
        if c.is_ascii() {
            if let Some(w) = self.char_widths.get(c as usize) {
                return *w;
            }
        }
        self.default_width
    }

    /// Width of a string in em, one advance per grapheme cluster
    pub fn text_width_em(&self, text: &str) -> f32 {
        text.graphemes(true)
            .map(|grapheme| {
                if grapheme == "\t" {
                    self.default_width * 4.0
                } else if grapheme.chars().all(|c| c.is_control()) {
                    0.0
                } else {
                    grapheme.chars().next().map(|c| self.width(c)).unwrap_or(0.0)
                }
            })
            .sum()
    }
}

impl TextMetrics for FontMetrics {
    fn measure_width(&self, text: &str, font: &FontSpec) -> Result<f32> {
        Ok(self.text_width_em(text) * font.size_px)
    }

    fn line_height_px(&self, font: &FontSpec, multiplier: f32) -> Result<f32> {
        Ok(font.size_px * multiplier)
    }
}

/// Library of loaded fonts, keyed by family name (case-insensitive)
#[derive(Debug, Clone)]
pub struct FontLibrary {
    fonts: FxHashMap<String, FontMetrics>,
}

impl Default for FontLibrary {
    fn default() -> Self {
        let mut library = Self::empty();
        library.set("monospace", FontMetrics::monospace());
        library
    }
}

impl FontLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// A library with no fonts at all
    pub fn empty() -> Self {
        Self {
            fonts: FxHashMap::default(),
        }
    }

    /// Set font metrics for a family, replacing any previous entry
    pub fn set(&mut self, family: &str, metrics: FontMetrics) {
        self.fonts.insert(family.to_lowercase(), metrics);
    }

    /// Get font metrics by family
    pub fn get(&self, family: &str) -> Option<&FontMetrics> {
        self.fonts.get(&family.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    fn resolve(&self, font: &FontSpec) -> Result<&FontMetrics> {
        self.get(&font.family)
            .ok_or_else(|| PaginationError::MeasurementUnavailable {
                family: font.family.clone(),
            })
    }
}

impl TextMetrics for FontLibrary {
    fn measure_width(&self, text: &str, font: &FontSpec) -> Result<f32> {
        self.resolve(font)?.measure_width(text, font)
    }

    fn line_height_px(&self, font: &FontSpec, multiplier: f32) -> Result<f32> {
        self.resolve(font)?.line_height_px(font, multiplier)
    }
}

/// Shared, host-mutable providers (fonts registered after construction)
impl<M: TextMetrics + ?Sized> TextMetrics for Rc<RefCell<M>> {
    fn measure_width(&self, text: &str, font: &FontSpec) -> Result<f32> {
        self.borrow().measure_width(text, font)
    }

    fn line_height_px(&self, font: &FontSpec, multiplier: f32) -> Result<f32> {
        self.borrow().line_height_px(font, multiplier)
    }

    fn invalidate(&self) {
        self.borrow().invalidate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WidthKey {
    family: String,
    size_bits: u32,
    text: String,
}

/// Memoizing wrapper around another provider
pub struct MemoizedMetrics<M> {
    inner: M,
    widths: RefCell<FxHashMap<WidthKey, f32>>,
    capacity: usize,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<M: TextMetrics> MemoizedMetrics<M> {
    pub fn new(inner: M) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: M, capacity: usize) -> Self {
        Self {
            inner,
            widths: RefCell::new(FxHashMap::default()),
            capacity: capacity.max(1),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    /// (hits, misses) since construction
    pub fn cache_stats(&self) -> (u64, u64) {
        (self.hits.get(), self.misses.get())
    }

    pub fn cached_len(&self) -> usize {
        self.widths.borrow().len()
    }
}

impl<M: TextMetrics> TextMetrics for MemoizedMetrics<M> {
    fn measure_width(&self, text: &str, font: &FontSpec) -> Result<f32> {
        let key = WidthKey {
            family: font.family.clone(),
            size_bits: font.size_px.to_bits(),
            text: text.to_string(),
        };
        if let Some(width) = self.widths.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return Ok(*width);
        }

        // Errors are not cached: the font may be registered later
        let width = self.inner.measure_width(text, font)?;
        self.misses.set(self.misses.get() + 1);

        let mut widths = self.widths.borrow_mut();
        if widths.len() >= self.capacity {
            widths.clear();
        }
        widths.insert(key, width);
        Ok(width)
    }

    fn line_height_px(&self, font: &FontSpec, multiplier: f32) -> Result<f32> {
        self.inner.line_height_px(font, multiplier)
    }

    fn invalidate(&self) {
        self.widths.borrow_mut().clear();
        self.inner.invalidate();
    }
}

/// Infallible measurement adapter used by the breakers.
///
/// Falls back to monospace metrics when the provider cannot resolve a font or
/// returns a nonsensical value.
pub struct Measurer<'a> {
    provider: &'a dyn TextMetrics,
    fallback: FontMetrics,
    warned: Cell<bool>,
}

impl<'a> Measurer<'a> {
    pub fn new(provider: &'a dyn TextMetrics) -> Self {
        Self {
            provider,
            fallback: FontMetrics::monospace(),
            warned: Cell::new(false),
        }
    }

    /// Rendered width of `text` in pixels
    pub fn width(&self, text: &str, font: &FontSpec) -> f32 {
        match self.provider.measure_width(text, font) {
            Ok(width) if width.is_finite() && width >= 0.0 => width,
            other => {
                self.note_fallback(font, other.err());
                self.fallback.text_width_em(text) * font.size_px
            }
        }
    }

    /// Height of one line in pixels, never zero
    pub fn line_height(&self, font: &FontSpec, multiplier: f32) -> f32 {
        match self.provider.line_height_px(font, multiplier) {
            Ok(height) if height.is_finite() && height > 0.0 => height,
            other => {
                self.note_fallback(font, other.err());
                font.size_px * multiplier
            }
        }
    }

    /// Whether any measurement so far needed the fallback metrics
    pub fn used_fallback(&self) -> bool {
        self.warned.get()
    }

    fn note_fallback(&self, font: &FontSpec, err: Option<PaginationError>) {
        if self.warned.replace(true) {
            return;
        }
        match err {
            Some(err) => tracing::warn!(%err, "falling back to monospace metrics"),
            None => tracing::warn!(
                family = %font.family,
                "metrics provider returned an invalid value, falling back to monospace"
            ),
        }
    }
}
