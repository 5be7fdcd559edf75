//! Persisted count of blocked requests.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::Document;

/// On-disk layout of `counter.toml`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct CounterFile {
    blocked_count: u64,
}

/// Monotonic counter, reset only on explicit request.
///
/// The live value is an atomic so readers never wait on the disk. Every
/// change is written through; writers racing on the save lock coalesce, the
/// one that gets it stores whatever the counter holds by then.
#[derive(Debug)]
pub struct BlockCounter {
    count: AtomicU64,
    /// Last value written to `doc`.
    saved: Mutex<u64>,
    doc: Document,
}

impl BlockCounter {
    pub fn open(doc: Document) -> Self {
        let file: CounterFile = doc.load();
        Self {
            count: AtomicU64::new(file.blocked_count),
            saved: Mutex::new(file.blocked_count),
            doc,
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Document::in_memory())
    }

    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Adds one and returns the new value.
    pub fn increment(&self) -> u64 {
        let previous = self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_add(1))
            })
            .unwrap_or_else(|c| c);
        self.flush();
        previous.saturating_add(1)
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.flush();
    }

    fn flush(&self) {
        let mut saved = self.saved.lock();
        let current = self.get();
        if current == *saved {
            return;
        }
        match self.doc.save(&CounterFile {
            blocked_count: current,
        }) {
            Ok(()) => *saved = current,
            Err(e) => warn!(error = %e, "Failed to persist blocked count"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_increment_n_times() {
        let counter = BlockCounter::in_memory();
        for _ in 0..25 {
            counter.increment();
        }
        assert_eq!(counter.get(), 25);
    }

    #[test]
    fn test_reset() {
        let counter = BlockCounter::in_memory();
        counter.increment();
        counter.reset();
        assert_eq!(counter.get(), 0);
        assert_eq!(counter.increment(), 1);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let counter = Arc::new(BlockCounter::in_memory());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..100 {
                        counter.increment();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.get(), 400);
    }

    #[test]
    fn test_get_does_not_wait_on_disk_writes() {
        let counter = Arc::new(BlockCounter::in_memory());
        counter.increment();
        // Stands in for a save in progress on another thread.
        let _saving = counter.saved.lock();
        let reader = {
            let counter = Arc::clone(&counter);
            thread::spawn(move || counter.get())
        };
        assert_eq!(reader.join().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_increments_reach_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.toml");
        {
            let counter = Arc::new(BlockCounter::open(Document::at(&path)));
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let counter = Arc::clone(&counter);
                    thread::spawn(move || {
                        for _ in 0..50 {
                            counter.increment();
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
        }
        assert_eq!(BlockCounter::open(Document::at(&path)).get(), 200);
    }

    #[test]
    fn test_reset_reaches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.toml");
        {
            let counter = BlockCounter::open(Document::at(&path));
            counter.increment();
            counter.reset();
        }
        assert_eq!(BlockCounter::open(Document::at(&path)).get(), 0);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.toml");
        {
            let counter = BlockCounter::open(Document::at(&path));
            counter.increment();
            counter.increment();
            counter.increment();
        }
        assert_eq!(BlockCounter::open(Document::at(&path)).get(), 3);
    }
}
