//! Render output: page diff protocol

mod diff;

pub use diff::{PageDiff, PagePatch};
