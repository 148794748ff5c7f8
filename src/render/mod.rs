/// Premultiplied RGBA8 pixel buffer.
pub mod buffer;
/// Reusable buffer free list.
pub mod pool;
