//! Published pagination snapshot

use crate::layout::Page;
use serde::{Deserialize, Serialize};

/// Lifecycle of a [`PaginationEngine`](crate::PaginationEngine)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Uninitialized,
    Ready,
    /// A debounced recalculation is scheduled
    Recalculating,
    Destroyed,
}

/// Complete, immutable pagination result shared with listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    pub pages: Vec<Page>,
    /// Always within `0..total_pages`
    pub current_page_index: usize,
    pub total_pages: usize,
    pub is_recalculating: bool,
}

impl PaginationState {
    /// Build a settled state, clamping the current page into range
    pub fn new(pages: Vec<Page>, current_page_index: usize) -> Self {
        let total_pages = pages.len();
        Self {
            current_page_index: current_page_index.min(total_pages.saturating_sub(1)),
            total_pages,
            pages,
            is_recalculating: false,
        }
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.pages.get(self.current_page_index)
    }

    /// Index of the page holding the character at byte `offset`.
    ///
    /// An offset at the very end of the text maps to the last page.
    pub fn page_index_at_offset(&self, offset: usize) -> Option<usize> {
        let last = self.pages.last()?;
        if offset >= last.end_offset {
            return (offset == last.end_offset).then_some(self.pages.len() - 1);
        }
        let index = self.pages.partition_point(|page| page.end_offset <= offset);
        Some(index)
    }

    /// The page the writer is most likely working on: the last one with
    /// visible text, or the first page when there is none
    pub fn follow_index(pages: &[Page]) -> usize {
        pages
            .iter()
            .rposition(Page::has_visible_content)
            .unwrap_or(0)
    }

    /// Copy of this state with the recalculation flag set
    pub fn recalculating(&self) -> Self {
        Self {
            is_recalculating: true,
            ..self.clone()
        }
    }

    /// Copy of this state showing another page
    pub fn with_current_page(&self, index: usize) -> Self {
        Self {
            current_page_index: index.min(self.total_pages.saturating_sub(1)),
            ..self.clone()
        }
    }

    /// Concatenated page contents, which equal the source text
    pub fn text(&self) -> String {
        self.pages.iter().map(|page| page.content.as_str()).collect()
    }
}
