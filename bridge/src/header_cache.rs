//! Lock-free cache of the best header tip and probable network height.
//!
//! These values are read on every consumer refresh, so reads must never
//! wait on node internals. The poll cycle is the only writer.
//!
//! Each field lives in its own atomic. A single field is never torn, but
//! the three fields are not updated as a unit: for up to one cycle a reader
//! may see a new height next to the previous time.

use std::sync::atomic::{AtomicU64, Ordering};

use chainview_types::Timestamp;

/// Snapshot of the cached header state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeaderTip {
    pub best_header_height: u64,
    pub best_header_time: Timestamp,
    pub probable_height: u64,
}

/// Atomic single-writer, multi-reader header cache. Starts at zero.
#[derive(Debug, Default)]
pub struct HeaderCache {
    best_header_height: AtomicU64,
    best_header_time: AtomicU64,
    probable_height: AtomicU64,
}

impl HeaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best_header_height(&self) -> u64 {
        self.best_header_height.load(Ordering::Acquire)
    }

    pub fn best_header_time(&self) -> Timestamp {
        Timestamp::new(self.best_header_time.load(Ordering::Acquire))
    }

    pub fn probable_height(&self) -> u64 {
        self.probable_height.load(Ordering::Acquire)
    }

    /// Read all three fields, one atomic load each.
    pub fn load(&self) -> HeaderTip {
        HeaderTip {
            best_header_height: self.best_header_height(),
            best_header_time: self.best_header_time(),
            probable_height: self.probable_height(),
        }
    }

    /// Commit new values. Only the reconciliation path may call this.
    pub(crate) fn store(&self, height: u64, time: Timestamp, probable_height: u64) {
        self.best_header_height.store(height, Ordering::Release);
        self.best_header_time.store(time.as_secs(), Ordering::Release);
        self.probable_height.store(probable_height, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn starts_at_zero() {
        let cache = HeaderCache::new();
        assert_eq!(cache.load(), HeaderTip::default());
        assert!(cache.best_header_time().is_epoch());
    }

    #[test]
    fn store_then_load() {
        let cache = HeaderCache::new();
        cache.store(120, Timestamp::new(1_700_000_000), 125);
        assert_eq!(
            cache.load(),
            HeaderTip {
                best_header_height: 120,
                best_header_time: Timestamp::new(1_700_000_000),
                probable_height: 125,
            }
        );
    }

    #[test]
    fn concurrent_reads_never_see_torn_values() {
        // Alternate between two bit patterns with no bits in common; a torn
        // read would show a mix of both.
        const OLD: u64 = 0x5555_5555_5555_5555;
        const NEW: u64 = 0xAAAA_AAAA_AAAA_AAAA;

        let cache = Arc::new(HeaderCache::new());
        cache.store(OLD, Timestamp::new(OLD), OLD);
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let cache = Arc::clone(&cache);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                for i in 0..200_000u32 {
                    let v = if i % 2 == 0 { NEW } else { OLD };
                    cache.store(v, Timestamp::new(v), v);
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    while !done.load(Ordering::SeqCst) {
                        let tip = cache.load();
                        for v in [
                            tip.best_header_height,
                            tip.best_header_time.as_secs(),
                            tip.probable_height,
                        ] {
                            assert!(v == OLD || v == NEW, "torn read: {v:#x}");
                        }
                    }
                })
            })
            .collect();

        writer.join().expect("writer");
        for reader in readers {
            reader.join().expect("reader");
        }
    }
}
