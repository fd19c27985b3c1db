// src/pool.rs
use parking_lot::Mutex;

use crate::context::Context;

/// Free list of reusable request contexts.
///
/// `acquire` hands out an idle context or builds a new one whose parameter
/// buffer holds `max_params` values. `release` wipes the request state and
/// keeps the context for reuse, up to `capacity` idle contexts; anything
/// beyond that is dropped.
pub struct ContextPool {
    free: Mutex<Vec<Context>>,
    max_params: usize,
    capacity: usize,
}

impl ContextPool {
    pub fn new(max_params: usize, capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity.min(64))),
            max_params,
            capacity,
        }
    }

    /// Every context this pool hands out, new or reused, holds `max_params`
    /// parameter slots. The count is fixed when the router is built.
    pub fn acquire(&self) -> Context {
        let reused = self.free.lock().pop();
        reused.unwrap_or_else(|| Context::new(self.max_params))
    }

    pub fn release(&self, mut ctx: Context) {
        ctx.recycle();
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(ctx);
        }
    }

    /// Number of contexts waiting to be reused.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_params(&self) -> usize {
        self.max_params
    }
}

impl std::fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPool")
            .field("idle", &self.idle())
            .field("capacity", &self.capacity)
            .field("max_params", &self.max_params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::INITIAL_INDEX;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_pool_reuses_released_contexts() {
        let pool = ContextPool::new(3, 4);
        assert_eq!(pool.idle(), 0);

        let mut ctx = pool.acquire();
        ctx.set("session", "abc".to_string());
        pool.release(ctx);
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire();
        assert_eq!(pool.idle(), 0);
        assert_eq!(ctx.store_len(), 0);
        assert_eq!(ctx.index(), INITIAL_INDEX);
        assert!(ctx.get::<String>("session").is_none());
    }

    #[test]
    fn test_pooled_contexts_keep_param_slots() {
        let pool = ContextPool::new(3, 4);
        let ctx = pool.acquire();
        assert_eq!(ctx.param_capacity(), 3);
        pool.release(ctx);

        let ctx = pool.acquire();
        assert_eq!(pool.idle(), 0);
        assert_eq!(ctx.param_capacity(), 3);
    }

    #[test]
    fn test_pool_respects_capacity() {
        let pool = ContextPool::new(0, 2);
        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        pool.release(a);
        pool.release(b);
        pool.release(c);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_pool_concurrent_acquire_release() {
        let pool = Arc::new(ContextPool::new(2, 16));
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for n in 0..200 {
                        let mut ctx = pool.acquire();
                        assert_eq!(ctx.store_len(), 0);
                        ctx.set("worker", (i, n));
                        pool.release(ctx);
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert!(pool.idle() <= 16);
    }
}
