use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::render::buffer::PixelBuffer;

/// Retention caps for a [`BufferPool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolOpts {
    /// Maximum bytes retained across all idle buffers.
    pub max_pool_bytes: usize,
    /// Maximum number of idle buffers.
    pub max_buffers: usize,
}

impl Default for PoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 64 * 1024 * 1024,
            max_buffers: 8,
        }
    }
}

/// Allocation counters, for diagnostics and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Idle buffers currently held.
    pub retained_buffers: usize,
    /// Capacity bytes of idle buffers.
    pub retained_bytes: usize,
    /// Fresh allocations made by `obtain`.
    pub alloc_buffers: u64,
    /// `obtain` calls served from the free list.
    pub reused_buffers: u64,
    /// Buffers dropped on recycle because a cap was hit.
    pub dropped_on_recycle: u64,
}

struct Inner {
    free: Vec<PixelBuffer>,
    stats: PoolStats,
}

/// Free list of reusable pixel buffers.
///
/// A buffer is either idle in the pool or owned by exactly one caller. Reuse picks the
/// first idle buffer whose allocation fits, so a large buffer can serve a small request.
pub struct BufferPool {
    opts: PoolOpts,
    inner: Mutex<Inner>,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolOpts::default())
    }
}

impl BufferPool {
    /// Empty pool.
    pub fn new(opts: PoolOpts) -> Self {
        Self {
            opts,
            inner: Mutex::new(Inner {
                free: Vec::new(),
                stats: PoolStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A cleared buffer of exactly `width x height`, or `None` for a zero dimension.
    pub fn obtain(&self, width: u32, height: u32) -> Option<PixelBuffer> {
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "refusing empty pixel buffer");
            return None;
        }
        let needed = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);

        let mut inner = self.lock();
        if let Some(i) = inner.free.iter().position(|b| b.capacity_bytes() >= needed) {
            let mut buf = inner.free.swap_remove(i);
            inner.stats.retained_buffers = inner.stats.retained_buffers.saturating_sub(1);
            inner.stats.retained_bytes = inner
                .stats
                .retained_bytes
                .saturating_sub(buf.capacity_bytes());
            inner.stats.reused_buffers = inner.stats.reused_buffers.saturating_add(1);
            drop(inner);
            buf.reshape(width, height);
            return Some(buf);
        }
        inner.stats.alloc_buffers = inner.stats.alloc_buffers.saturating_add(1);
        drop(inner);
        Some(PixelBuffer::new(width, height))
    }

    /// Hand a buffer back. `None` is a no-op.
    pub fn recycle(&self, buffer: Option<PixelBuffer>) {
        let Some(buf) = buffer else {
            return;
        };
        let bytes = buf.capacity_bytes();
        let mut inner = self.lock();
        if inner.free.len() >= self.opts.max_buffers
            || inner.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes
        {
            inner.stats.dropped_on_recycle = inner.stats.dropped_on_recycle.saturating_add(1);
            return;
        }
        inner.free.push(buf);
        inner.stats.retained_buffers = inner.stats.retained_buffers.saturating_add(1);
        inner.stats.retained_bytes = inner.stats.retained_bytes.saturating_add(bytes);
    }

    /// Release every idle buffer.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.free.clear();
        inner.free.shrink_to_fit();
        inner.stats.retained_buffers = 0;
        inner.stats.retained_bytes = 0;
    }

    /// Bytes held by idle buffers.
    pub fn memory_size(&self) -> usize {
        self.lock().stats.retained_bytes
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> PoolStats {
        self.lock().stats.clone()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pool.rs"]
mod tests;
