//! Manuscript Pager: deterministic pagination for a manuscript editor
//!
//! This crate turns a chapter's plain text and a physical page setup into an
//! ordered list of pages:
//! - Greedy word wrapping against pluggable text metrics
//! - Page breaking with an optional chapter heading on the first page
//! - A debounced engine that publishes immutable snapshots to listeners
//! - Page diffs so a renderer only redraws what changed

pub mod engine;
pub mod error;
pub mod layout;
pub mod render;
pub mod scheduler;
pub mod wasm;

// Re-export WASM types for direct use
pub use wasm::WasmPaginator;

// Re-export primary types
pub use engine::{
    EngineOptions, EnginePhase, EngineStats, ListenerRegistry, PaginationEngine, PaginationState,
    SubscriptionId,
};
pub use error::{PaginationError, Result};
pub use layout::{
    paginate_text, ConfigPatch, FontLibrary, FontMetrics, FontSpec, LineBreaker, LineLayout,
    MemoizedMetrics, Page, PageBreaker, PageId, PaginationConfig, TextMetrics,
};
pub use render::{PageDiff, PagePatch};
pub use scheduler::{Clock, SystemClock, VirtualClock};
