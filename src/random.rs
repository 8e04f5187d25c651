use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the values drawn for the `R` field token.
///
/// Implementations must be safe to call from several parsers at once.
pub trait RandomSource: Send + Sync {
    /// A uniformly distributed value in `min..=max`.
    fn between(&self, min: u16, max: u16) -> u16;
}

/// A [`StdRng`] behind a lock so concurrent draws are serialized.
pub struct ThreadSafeRng {
    inner: Mutex<StdRng>,
}

impl ThreadSafeRng {
    /// Seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self {
            inner: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for ThreadSafeRng {
    fn between(&self, min: u16, max: u16) -> u16 {
        self.inner.lock().gen_range(min..=max)
    }
}

static SYSTEM: LazyLock<Arc<ThreadSafeRng>> =
    LazyLock::new(|| Arc::new(ThreadSafeRng::from_entropy()));

/// The process-wide random source used by [`crate::Parser::new`].
pub fn system() -> Arc<dyn RandomSource> {
    SYSTEM.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draws_stay_in_bounds() {
        let rng = ThreadSafeRng::seeded(7);
        for _ in 0..500 {
            let v = rng.between(1970, 2099);
            assert!((1970..=2099).contains(&v));
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = ThreadSafeRng::seeded(42);
        let b = ThreadSafeRng::seeded(42);
        let xs: Vec<u16> = (0..10).map(|_| a.between(0, 59)).collect();
        let ys: Vec<u16> = (0..10).map(|_| b.between(0, 59)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_concurrent_draws() {
        let rng = Arc::new(ThreadSafeRng::seeded(1));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let rng = rng.clone();
                std::thread::spawn(move || (0..100).map(|_| rng.between(0, 6)).max())
            })
            .collect();
        for handle in handles {
            let max = handle.join().unwrap().unwrap();
            assert!(max <= 6);
        }
    }
}
