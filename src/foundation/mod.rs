/// Shared value types: sizes, rectangles, tags and container formats.
pub mod core;
/// Error taxonomy and result alias.
pub mod error;
pub(crate) mod math;
