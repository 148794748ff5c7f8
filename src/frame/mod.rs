//! Frame metadata and the compositing engine.

/// Premultiplied pixel operations used by the compositor.
pub mod blend;
/// Canvas reconstruction from differential frames.
pub mod compositor;
/// Parsed animation description.
pub mod model;
