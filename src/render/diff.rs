//! Page diff protocol for incremental re-rendering

use crate::engine::PaginationState;
use crate::layout::Page;
use serde::Serialize;

/// A single patch operation for the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PagePatch {
    /// A page exists that did not before
    #[serde(rename_all = "camelCase")]
    InsertPage {
        page_number: usize,
        start_offset: usize,
        end_offset: usize,
    },
    /// A trailing page no longer exists
    #[serde(rename_all = "camelCase")]
    RemovePage { page_number: usize },
    /// The page's range, content or heading changed
    #[serde(rename_all = "camelCase")]
    UpdatePage {
        page_number: usize,
        start_offset: usize,
        end_offset: usize,
    },
    /// The page shown to the writer changed
    MoveCurrentPage { from: usize, to: usize },
}

/// Patches turning one published state into the next
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageDiff {
    pub generation: u64,
    pub patches: Vec<PagePatch>,
}

impl PageDiff {
    /// Create empty diff
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            patches: Vec::new(),
        }
    }

    /// Compare two states page by page; no previous state inserts every page
    pub fn between(
        generation: u64,
        previous: Option<&PaginationState>,
        current: &PaginationState,
    ) -> Self {
        let mut diff = Self::new(generation);
        let prev_pages: &[Page] = previous.map(|state| state.pages.as_slice()).unwrap_or(&[]);

        for (index, page) in current.pages.iter().enumerate() {
            match prev_pages.get(index) {
                None => diff.add_patch(PagePatch::InsertPage {
                    page_number: page.page_number,
                    start_offset: page.start_offset,
                    end_offset: page.end_offset,
                }),
                Some(prev) if prev != page => diff.add_patch(PagePatch::UpdatePage {
                    page_number: page.page_number,
                    start_offset: page.start_offset,
                    end_offset: page.end_offset,
                }),
                Some(_) => {}
            }
        }

        // Remove pages that no longer exist
        for prev in prev_pages.iter().skip(current.pages.len()) {
            diff.add_patch(PagePatch::RemovePage {
                page_number: prev.page_number,
            });
        }

        if let Some(previous) = previous {
            if previous.current_page_index != current.current_page_index {
                diff.add_patch(PagePatch::MoveCurrentPage {
                    from: previous.current_page_index,
                    to: current.current_page_index,
                });
            }
        }

        diff
    }

    /// Add a patch
    pub fn add_patch(&mut self, patch: PagePatch) {
        self.patches.push(patch);
    }

    /// Check if there are any patches
    pub fn has_patches(&self) -> bool {
        !self.patches.is_empty()
    }

    /// Get patch count
    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Page numbers whose content must be re-rendered
    pub fn dirty_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.patches.iter().filter_map(|patch| match patch {
            PagePatch::InsertPage { page_number, .. } | PagePatch::UpdatePage { page_number, .. } => {
                Some(*page_number)
            }
            _ => None,
        })
    }
}
