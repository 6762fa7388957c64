//! Burst debouncing for source change events.
//!
//! Editors and build tools touch many files in quick succession (save,
//! format, write artifacts). A burst is closed once no new change arrived
//! for the configured duration, and is then handed out as one batch so a
//! single build cycle covers it.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Collects changed paths until the burst goes quiet.
#[derive(Debug)]
pub struct Debouncer {
    /// Paths touched in the current burst.
    pending: BTreeSet<PathBuf>,
    /// Time of the most recent change in the burst.
    last_change: Option<Instant>,
    /// Quiet period that closes a burst.
    duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given duration in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: BTreeSet::new(),
            last_change: None,
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Record a change. Restarts the quiet period for the whole burst.
    pub fn record(&mut self, path: PathBuf) {
        self.pending.insert(path);
        self.last_change = Some(Instant::now());
    }

    /// Take the whole burst once it has been quiet long enough.
    ///
    /// Returns an empty batch while changes are still arriving.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        match self.last_change {
            Some(last) if last.elapsed() >= self.duration => {
                self.last_change = None;
                std::mem::take(&mut self.pending).into_iter().collect()
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_debouncer_basic() {
        let mut debouncer = Debouncer::new(50);

        let path = PathBuf::from("/app/components/foo/foo.html");
        debouncer.record(path.clone());

        // Immediately after, nothing should be ready
        assert!(debouncer.take_ready().is_empty());

        sleep(Duration::from_millis(60));

        let ready = debouncer.take_ready();
        assert_eq!(ready, vec![path]);
        // The burst is gone once taken
        assert!(debouncer.take_ready().is_empty());
    }

    #[test]
    fn test_burst_is_released_as_one_batch() {
        let mut debouncer = Debouncer::new(50);

        let first = PathBuf::from("/app/components/a.js");
        let second = PathBuf::from("/app/components/b.js");

        debouncer.record(first.clone());
        sleep(Duration::from_millis(30));
        debouncer.record(second.clone());

        // 55ms after the first change but only 25ms after the second
        sleep(Duration::from_millis(25));
        assert!(debouncer.take_ready().is_empty());

        sleep(Duration::from_millis(35));
        assert_eq!(debouncer.take_ready(), vec![first, second]);
    }

    #[test]
    fn test_repeated_path_counts_once() {
        let mut debouncer = Debouncer::new(10);

        let path = PathBuf::from("/app/components/foo/foo.config.json");
        debouncer.record(path.clone());
        debouncer.record(path.clone());

        sleep(Duration::from_millis(20));
        assert_eq!(debouncer.take_ready(), vec![path]);
    }

    #[test]
    fn test_new_burst_after_release() {
        let mut debouncer = Debouncer::new(10);

        let first = PathBuf::from("/app/components/foo/foo.view.html");
        let second = PathBuf::from("/app/components/bar/bar.view.html");
        debouncer.record(first.clone());
        sleep(Duration::from_millis(20));
        assert_eq!(debouncer.take_ready(), vec![first]);

        debouncer.record(second.clone());
        assert!(debouncer.take_ready().is_empty());
        sleep(Duration::from_millis(20));
        assert_eq!(debouncer.take_ready(), vec![second]);
    }
}
