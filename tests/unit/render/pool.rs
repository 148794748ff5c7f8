use super::*;
use std::sync::Arc;

#[test]
fn zero_dimension_yields_none() {
    let pool = BufferPool::default();
    assert!(pool.obtain(0, 10).is_none());
    assert!(pool.obtain(10, 0).is_none());
    assert_eq!(pool.stats().alloc_buffers, 0);
}

#[test]
fn recycled_buffer_is_reused_and_cleared() {
    let pool = BufferPool::default();
    let mut a = pool.obtain(8, 8).unwrap();
    a.fill([255, 255, 255, 255]);
    let ptr = a.data().as_ptr();
    pool.recycle(Some(a));

    let b = pool.obtain(4, 6).unwrap();
    assert_eq!(b.data().as_ptr(), ptr);
    assert_eq!((b.width(), b.height()), (4, 6));
    assert!(b.data().iter().all(|&v| v == 0));

    let stats = pool.stats();
    assert_eq!(stats.alloc_buffers, 1);
    assert_eq!(stats.reused_buffers, 1);
}

#[test]
fn small_buffer_does_not_serve_larger_request() {
    let pool = BufferPool::default();
    pool.recycle(pool.obtain(2, 2));
    let big = pool.obtain(16, 16).unwrap();
    assert_eq!(big.data().len(), 16 * 16 * 4);
    assert_eq!(pool.stats().alloc_buffers, 2);
    assert_eq!(pool.stats().retained_buffers, 1);
}

#[test]
fn caps_drop_excess_buffers() {
    let pool = BufferPool::new(PoolOpts {
        max_pool_bytes: 1024,
        max_buffers: 1,
    });
    pool.recycle(pool.obtain(4, 4));
    pool.recycle(pool.obtain(4, 4).map(|_| PixelBuffer::new(4, 4)));
    pool.recycle(Some(PixelBuffer::new(32, 32)));
    let stats = pool.stats();
    assert_eq!(stats.retained_buffers, 1);
    assert!(stats.dropped_on_recycle >= 1);
    assert_eq!(pool.memory_size(), stats.retained_bytes);

    pool.recycle(None);
    pool.clear();
    assert_eq!(pool.memory_size(), 0);
    assert_eq!(pool.stats().retained_buffers, 0);
}

#[test]
fn concurrent_obtain_and_recycle() {
    let pool = Arc::new(BufferPool::default());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pool = pool.clone();
            std::thread::spawn(move || {
                for n in 0..50u32 {
                    let b = pool.obtain(1 + (n + i) % 7, 3);
                    pool.recycle(b);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let stats = pool.stats();
    assert!(stats.retained_buffers <= PoolOpts::default().max_buffers);
    assert_eq!(stats.alloc_buffers + stats.reused_buffers, 200);
}
