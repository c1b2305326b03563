//! Pagination for multi-page chapters

use crate::layout::config::{PaginationConfig, TITLE_LINE_HEIGHT};
use crate::layout::font::Measurer;
use crate::layout::line_break::{LineBreaker, LineLayout};
use serde::{Deserialize, Serialize};

/// Identifier of a page within one recomputation.
///
/// Derived from the page number, so the same id may name a different range
/// of text after the next recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub usize);

/// One paginated unit of the source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    /// 1-based, contiguous
    pub page_number: usize,
    /// Byte offset of the first character on this page
    pub start_offset: usize,
    /// Byte offset one past the last character on this page
    pub end_offset: usize,
    pub content: String,
    /// Wrapped lines on this page
    pub line_count: usize,
    pub is_first_page_of_chapter: bool,
    pub chapter_title: Option<String>,
}

impl Page {
    /// Whether this page holds anything besides whitespace
    pub fn has_visible_content(&self) -> bool {
        self.content.chars().any(|c| !c.is_whitespace())
    }

    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset == self.end_offset
    }
}

/// Line budgets for the first and following pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBudget {
    pub first_page: usize,
    pub other_pages: usize,
}

impl LineBudget {
    /// Compute how many body lines fit on each page position
    pub fn compute(config: &PaginationConfig, measurer: &Measurer<'_>) -> Self {
        let body_font = config.body_font();
        let line_height = measurer.line_height(&body_font, config.line_height_multiplier);
        let available = config.content_height_px();
        let other_pages = lines_in(available, line_height);

        let first_page = match config.shown_chapter_title() {
            Some(title) => {
                let reserved =
                    title_block_height(title, config, measurer) + config.chapter_title_padding_px;
                lines_in(available - reserved, line_height)
            }
            None => other_pages,
        };

        Self {
            first_page,
            other_pages,
        }
    }

    /// Budget for the page at `index` (0-based)
    pub fn for_page(&self, index: usize) -> usize {
        if index == 0 {
            self.first_page
        } else {
            self.other_pages
        }
    }
}

/// Whole lines of `line_height` that fit in `height`, at least one
fn lines_in(height: f32, line_height: f32) -> usize {
    let lines = (height / line_height).floor();
    if lines.is_finite() && lines >= 1.0 {
        lines as usize
    } else {
        1
    }
}

/// Height of the wrapped chapter heading
fn title_block_height(title: &str, config: &PaginationConfig, measurer: &Measurer<'_>) -> f32 {
    let title_font = config.title_font();
    let title_lines = LineBreaker::new()
        .break_lines(title, config.content_width_px(), &title_font, measurer)
        .len()
        .max(1);
    title_lines as f32 * measurer.line_height(&title_font, TITLE_LINE_HEIGHT)
}

/// Groups wrapped lines into pages
#[derive(Debug, Default)]
pub struct PageBreaker;

impl PageBreaker {
    pub fn new() -> Self {
        Self
    }

    /// Walk `lines` in order, closing a page whenever its budget is used up.
    ///
    /// No lines yields exactly one empty page.
    pub fn paginate(
        &self,
        source: &str,
        lines: &[LineLayout],
        budget: LineBudget,
        config: &PaginationConfig,
    ) -> Vec<Page> {
        let title = config.shown_chapter_title();
        let mut pages = Vec::new();

        let mut remaining = lines;
        let mut start_offset = 0;
        while !remaining.is_empty() || pages.is_empty() {
            let take = budget.for_page(pages.len()).max(1).min(remaining.len());
            let (on_page, rest) = remaining.split_at(take);
            let end_offset = match rest.first() {
                Some(next) => next.start(),
                None => source.len(),
            };

            pages.push(Self::make_page(
                pages.len(),
                source,
                start_offset..end_offset,
                on_page.len(),
                title,
            ));

            start_offset = end_offset;
            remaining = rest;
        }

        pages
    }

    fn make_page(
        index: usize,
        source: &str,
        range: std::ops::Range<usize>,
        line_count: usize,
        title: Option<&str>,
    ) -> Page {
        let is_first_page_of_chapter = index == 0 && title.is_some();
        Page {
            id: PageId(index + 1),
            page_number: index + 1,
            start_offset: range.start,
            end_offset: range.end,
            content: source[range].to_string(),
            line_count,
            is_first_page_of_chapter,
            chapter_title: if is_first_page_of_chapter {
                title.map(str::to_string)
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font::FontMetrics;

    // 16px font, 1.0 line height: content area of 1in x 1in holds 6 lines
    fn small_config() -> PaginationConfig {
        PaginationConfig {
            page_width_in: 2.0,
            page_height_in: 2.0,
            margin_top_in: 0.5,
            margin_bottom_in: 0.5,
            margin_left_in: 0.5,
            margin_right_in: 0.5,
            font_size_pt: 12.0,
            font_family: "Test".to_string(),
            line_height_multiplier: 1.0,
            ..Default::default()
        }
    }

    fn paginate(text: &str, config: &PaginationConfig) -> (Vec<Page>, LineBudget) {
        let metrics = FontMetrics::uniform(0.5);
        let measurer = Measurer::new(&metrics);
        let lines = LineBreaker::new().break_lines(
            text,
            config.content_width_px(),
            &config.body_font(),
            &measurer,
        );
        let budget = LineBudget::compute(config, &measurer);
        (PageBreaker::new().paginate(text, &lines, budget, config), budget)
    }

    #[test]
    fn test_budget_without_title() {
        let metrics = FontMetrics::uniform(0.5);
        let measurer = Measurer::new(&metrics);
        let budget = LineBudget::compute(&small_config(), &measurer);
        assert_eq!(budget, LineBudget { first_page: 6, other_pages: 6 });
        assert_eq!(budget.for_page(3), 6);
    }

    #[test]
    fn test_budget_with_title() {
        let metrics = FontMetrics::uniform(0.5);
        let measurer = Measurer::new(&metrics);
        let config = PaginationConfig {
            chapter_title: Some("One".to_string()),
            show_chapter_title: true,
            chapter_title_font_size_pt: 12.0,
            chapter_title_padding_px: 12.0,
            ..small_config()
        };
        // 96 - (16 * 1.2 + 12) = 64.8 -> 4 lines
        let budget = LineBudget::compute(&config, &measurer);
        assert_eq!(budget, LineBudget { first_page: 4, other_pages: 6 });
    }

    #[test]
    fn test_budget_keeps_one_line_under_huge_title() {
        let metrics = FontMetrics::uniform(0.5);
        let measurer = Measurer::new(&metrics);
        let config = PaginationConfig {
            chapter_title: Some("A Title That Wraps Over Many Many Lines".to_string()),
            show_chapter_title: true,
            chapter_title_font_size_pt: 48.0,
            ..small_config()
        };
        assert_eq!(LineBudget::compute(&config, &measurer).first_page, 1);
    }

    #[test]
    fn test_empty_text_single_page() {
        let (pages, _) = paginate("", &small_config());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].start_offset, 0);
        assert_eq!(pages[0].end_offset, 0);
        assert_eq!(pages[0].content, "");
        assert_eq!(pages[0].line_count, 0);
        assert!(!pages[0].is_first_page_of_chapter);
    }

    #[test]
    fn test_pages_partition_text() {
        let text = (1..=20).map(|i| format!("line {i}\n")).collect::<String>();
        let (pages, budget) = paginate(&text, &small_config());
        // 20 lines plus the empty trailing line
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[0].start_offset, 0);
        for pair in pages.windows(2) {
            assert_eq!(pair[0].end_offset, pair[1].start_offset);
        }
        assert_eq!(pages.last().unwrap().end_offset, text.len());
        assert_eq!(pages.iter().map(|p| p.content.as_str()).collect::<String>(), text);
        for (index, page) in pages.iter().enumerate() {
            assert_eq!(page.page_number, index + 1);
            assert_eq!(page.id, PageId(index + 1));
            assert!(page.line_count <= budget.for_page(index));
        }
    }

    #[test]
    fn test_first_page_of_chapter() {
        let config = PaginationConfig {
            chapter_title: Some("Chapter 1".to_string()),
            show_chapter_title: true,
            ..small_config()
        };
        let text = "word ".repeat(200);
        let (pages, _) = paginate(&text, &config);
        assert!(pages[0].is_first_page_of_chapter);
        assert_eq!(pages[0].chapter_title.as_deref(), Some("Chapter 1"));
        assert!(pages[1..].iter().all(|p| !p.is_first_page_of_chapter && p.chapter_title.is_none()));

        let (untitled, _) = paginate(&text, &small_config());
        assert!(pages[0].line_count < untitled[0].line_count);
    }

    #[test]
    fn test_hidden_title_is_not_marked() {
        let config = PaginationConfig {
            chapter_title: Some("Chapter 1".to_string()),
            show_chapter_title: false,
            ..small_config()
        };
        let (pages, _) = paginate("hello", &config);
        assert!(!pages[0].is_first_page_of_chapter);
        assert_eq!(pages[0].chapter_title, None);
    }

    #[test]
    fn test_visible_content() {
        let (pages, _) = paginate("\n\n\n\n\n\n\n", &small_config());
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| !p.has_visible_content()));
    }
}
