//! Line breaking, page breaking and the measurements they rely on

pub mod config;
pub mod font;
mod line_break;
mod pagination;

pub use config::{ConfigPatch, PaginationConfig, DPI};
pub use font::{FontLibrary, FontMetrics, FontSpec, Measurer, MemoizedMetrics, TextMetrics};
pub use line_break::{LineBreaker, LineLayout};
pub use pagination::{LineBudget, Page, PageBreaker, PageId};

/// Run the line and page breakers over `text` for one configuration
pub fn paginate_text(
    text: &str,
    config: &PaginationConfig,
    metrics: &dyn TextMetrics,
) -> (Vec<Page>, LineBudget) {
    let measurer = Measurer::new(metrics);
    let lines = LineBreaker::new().break_lines(
        text,
        config.content_width_px(),
        &config.body_font(),
        &measurer,
    );
    let budget = LineBudget::compute(config, &measurer);
    let pages = PageBreaker::new().paginate(text, &lines, budget, config);
    (pages, budget)
}
