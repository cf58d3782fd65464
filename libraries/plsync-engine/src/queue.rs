//! Coalescing work queue
//!
//! Sync tools often touch a playlist several times while writing it. Each
//! event pushes the file's deadline out by the coalescing window, so a burst
//! ends up as a single attempt once the file has been quiet for a window.
//! Files keep their place in line while their deadline moves.
//!
//! The queue does no timing of its own; callers pass `now` in.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Due {
    Now,
    At(Instant),
}

/// FIFO of playlist paths with per-path deadlines
#[derive(Debug)]
pub struct SyncQueue {
    window: Duration,
    order: VecDeque<PathBuf>,
    due: HashMap<PathBuf, Due>,
}

impl SyncQueue {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            order: VecDeque::new(),
            due: HashMap::new(),
        }
    }

    /// Schedule `path` one window after `now`, extending an existing entry
    pub fn push(&mut self, path: impl Into<PathBuf>, now: Instant) {
        let path = path.into();
        let deadline = Due::At(now + self.window);

        if let Some(due) = self.due.get_mut(&path) {
            // A ready entry is already as early as it can get
            if matches!(due, Due::At(_)) {
                *due = deadline;
            }
            return;
        }

        self.order.push_back(path.clone());
        self.due.insert(path, deadline);
    }

    /// Queue `path` for processing without waiting
    pub fn push_ready(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.due.insert(path.clone(), Due::Now).is_none() {
            self.order.push_back(path);
        }
    }

    /// Take the longest-waiting path whose deadline has passed
    pub fn pop_ready(&mut self, now: Instant) -> Option<PathBuf> {
        let index = self.order.iter().position(|path| match self.due.get(path) {
            Some(Due::At(deadline)) => *deadline <= now,
            _ => true,
        })?;

        let path = self.order.remove(index)?;
        self.due.remove(&path);
        Some(path)
    }

    /// Earliest deadline among waiting paths
    pub fn next_deadline(&self) -> Option<Instant> {
        self.due
            .values()
            .filter_map(|due| match due {
                Due::At(deadline) => Some(*deadline),
                Due::Now => None,
            })
            .min()
    }

    /// Drop a pending path, returning whether it was queued
    pub fn remove(&mut self, path: &Path) -> bool {
        if self.due.remove(path).is_none() {
            return false;
        }
        self.order.retain(|queued| queued != path);
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.due.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(2);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_collapses_to_one_entry() {
        let t0 = Instant::now();
        let mut queue = SyncQueue::new(WINDOW);

        queue.push("/p/Pop.m3u8", t0);
        queue.push("/p/Pop.m3u8", t0 + ms(500));
        queue.push("/p/Pop.m3u8", t0 + ms(1500));

        assert_eq!(queue.len(), 1);
        // Still inside the window of the last event
        assert_eq!(queue.pop_ready(t0 + ms(3000)), None);
        assert_eq!(queue.next_deadline(), Some(t0 + ms(3500)));
        assert_eq!(queue.pop_ready(t0 + ms(3500)), Some(PathBuf::from("/p/Pop.m3u8")));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_extended_entry_keeps_its_place() {
        let t0 = Instant::now();
        let mut queue = SyncQueue::new(WINDOW);

        queue.push("/p/A.m3u8", t0);
        queue.push("/p/B.m3u8", t0 + ms(100));
        queue.push("/p/A.m3u8", t0 + ms(200));

        let later = t0 + ms(5000);
        assert_eq!(queue.pop_ready(later), Some(PathBuf::from("/p/A.m3u8")));
        assert_eq!(queue.pop_ready(later), Some(PathBuf::from("/p/B.m3u8")));
    }

    #[test]
    fn test_due_entry_overtakes_waiting_one() {
        let t0 = Instant::now();
        let mut queue = SyncQueue::new(WINDOW);

        queue.push("/p/A.m3u8", t0);
        queue.push("/p/B.m3u8", t0 + ms(100));
        queue.push("/p/A.m3u8", t0 + ms(1500));

        // B is due at 2.1s, A only at 3.5s
        assert_eq!(queue.pop_ready(t0 + ms(2100)), Some(PathBuf::from("/p/B.m3u8")));
        assert_eq!(queue.pop_ready(t0 + ms(2100)), None);
    }

    #[test]
    fn test_ready_entries_do_not_wait() {
        let t0 = Instant::now();
        let mut queue = SyncQueue::new(WINDOW);

        queue.push_ready("/p/A.m3u8");
        queue.push_ready("/p/A.m3u8");
        queue.push("/p/A.m3u8", t0);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_deadline(), None);
        assert_eq!(queue.pop_ready(t0), Some(PathBuf::from("/p/A.m3u8")));
    }

    #[test]
    fn test_remove_drops_pending_work() {
        let t0 = Instant::now();
        let mut queue = SyncQueue::new(WINDOW);

        queue.push("/p/A.m3u8", t0);
        assert!(queue.contains(Path::new("/p/A.m3u8")));
        assert!(queue.remove(Path::new("/p/A.m3u8")));
        assert!(!queue.remove(Path::new("/p/A.m3u8")));
        assert_eq!(queue.pop_ready(t0 + WINDOW), None);
        assert_eq!(queue.next_deadline(), None);
    }
}
