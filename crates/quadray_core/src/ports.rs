//! External collaborator ports (§6).
//!
//! The engine core never talks to an OS allocator or OS threads directly;
//! it is driven through two small traits the embedding application
//! supplies (or that default, rayon-backed implementations satisfy out of
//! the box). This mirrors `amethyst_core::thread_pool::ThreadPool`, which
//! wraps an `Arc<rayon::ThreadPool>` behind a narrow `spawn` surface so the
//! rest of the engine never names `rayon` directly.

/// Caller-supplied allocator port: `alloc(size) -> ptr`, `free(ptr, size)`
/// (§6). The core's own arena ([`crate::arena::Arena`]) is layered on top
/// of whatever this port provides; over-aligned requests are honored by
/// the arena, not by this port.
pub trait AllocPort: Send + Sync {
    /// Allocates `size` bytes, naturally aligned up to 16 bytes.
    fn alloc(&self, size: usize) -> *mut u8;
    /// Frees a block previously returned by [`AllocPort::alloc`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by a prior call to `alloc` on the same
    /// port with the same `size`, and must not have already been freed.
    unsafe fn free(&self, ptr: *mut u8, size: usize);
}

/// System allocator-backed [`AllocPort`], the default when no embedder
/// supplies one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAlloc;

impl AllocPort for SystemAlloc {
    fn alloc(&self, size: usize) -> *mut u8 {
        let layout = std::alloc::Layout::from_size_align(size.max(1), 16)
            .expect("size/align must form a valid layout");
        // SAFETY: layout is non-zero sized and validated above.
        unsafe { std::alloc::alloc_zeroed(layout) }
    }

    unsafe fn free(&self, ptr: *mut u8, size: usize) {
        let layout = std::alloc::Layout::from_size_align(size.max(1), 16)
            .expect("size/align must form a valid layout");
        // SAFETY: caller contract requires `ptr`/`size` to match a prior alloc.
        unsafe { std::alloc::dealloc(ptr, layout) };
    }
}

/// One update-pipeline phase, as enumerated in §5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Phase 1: per-surface bound/clip/inverse/side-car recomputation.
    UpdateBounds,
    /// Tiling: per-thread tile-grid construction.
    Tiling,
    /// Sorting + rendering: per-tile packet tracing.
    Render,
}

/// Thread-pool port: `init_pool`, `terminate_pool`, and the two
/// barrier-style phase entry points from §6. Each dispatch call blocks
/// until every worker has finished the phase; this is the only
/// synchronization primitive the core relies on (§5).
pub trait ThreadPoolPort: Send + Sync {
    /// Runs `job` once per worker slice, `0..thnum`, blocking until all
    /// slices complete. `job` receives its slice index and the total
    /// worker count.
    fn dispatch(&self, thnum: usize, phase: Phase, job: &(dyn Fn(usize, usize) + Sync));

    /// Number of workers this pool was constructed with.
    fn thread_count(&self) -> usize;
}

/// Rayon-backed [`ThreadPoolPort`], the default when no embedder supplies
/// a custom pool. Grounded on `amethyst_core::thread_pool::ThreadPool`'s
/// `Arc<rayon::ThreadPool>` wrapper.
#[cfg(feature = "rayon-pool")]
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

#[cfg(feature = "rayon-pool")]
impl RayonThreadPool {
    /// Builds a pool with exactly `thnum` worker threads.
    ///
    /// # Panics
    ///
    /// Panics if rayon fails to spawn the requested thread count — a pool
    /// that cannot start is a construction-time failure, not a per-frame
    /// one.
    #[must_use]
    pub fn new(thnum: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thnum)
            .build()
            .expect("failed to build worker thread pool");
        Self { pool }
    }
}

#[cfg(feature = "rayon-pool")]
impl ThreadPoolPort for RayonThreadPool {
    fn dispatch(&self, thnum: usize, _phase: Phase, job: &(dyn Fn(usize, usize) + Sync)) {
        self.pool.scope(|scope| {
            for slice in 0..thnum {
                scope.spawn(move |_| job(slice, thnum));
            }
        });
    }

    fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(all(test, feature = "rayon-pool"))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatch_runs_every_slice_exactly_once() {
        let pool = RayonThreadPool::new(4);
        let counter = AtomicUsize::new(0);
        pool.dispatch(4, Phase::UpdateBounds, &|_slice, _total| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }
}
