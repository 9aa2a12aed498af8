//! Bounded Load Queue: FIFO admission with at most `limit` resolutions in
//! flight, per-filename deduplication and a session-lifetime result cache.
//!
//! The queue is plain state with no I/O. The loader actor owns one instance
//! and drives it from a single task, so no locking is involved. `W` is the
//! waiter type (a reply channel in the loader, anything in tests).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::cache::SurfaceCache;
use crate::surface::Surface;

/// Outcome of [`LoadQueue::request`].
#[derive(Debug)]
pub enum Requested<W> {
    /// Already cached: the waiter is handed back to be answered right away.
    Cached(Arc<Surface>, W),
    /// A new request was appended to the pending sequence.
    Queued,
    /// A request for this filename was already waiting or in flight.
    Attached,
}

/// A request that just received a concurrency slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub filename: String,
    pub poster_index: usize,
}

/// A waiting request dropped by [`LoadQueue::reset`], with its waiters.
#[derive(Debug)]
pub struct Dropped<W> {
    pub filename: String,
    pub poster_index: usize,
    pub waiters: Vec<W>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Waiting,
    /// Admitted during `epoch`; only completions from the current epoch free a slot.
    InFlight { epoch: u64 },
}

#[derive(Debug)]
struct PendingLoad<W> {
    poster_index: usize,
    waiters: Vec<W>,
    state: LoadState,
}

#[derive(Debug)]
pub struct LoadQueue<W> {
    limit: usize,
    cache: SurfaceCache,
    pending: VecDeque<String>,
    requests: HashMap<String, PendingLoad<W>>,
    admitted: usize,
    epoch: u64,
}

impl<W> LoadQueue<W> {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            cache: SurfaceCache::new(),
            pending: VecDeque::new(),
            requests: HashMap::new(),
            admitted: 0,
            epoch: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Register interest in `filename`. Later duplicates never move the
    /// original request's position in the pending sequence.
    pub fn request(&mut self, filename: &str, poster_index: usize, waiter: W) -> Requested<W> {
        if let Some(surface) = self.cache.get(filename) {
            return Requested::Cached(surface, waiter);
        }
        if let Some(existing) = self.requests.get_mut(filename) {
            existing.waiters.push(waiter);
            return Requested::Attached;
        }
        self.requests.insert(
            filename.to_string(),
            PendingLoad {
                poster_index,
                waiters: vec![waiter],
                state: LoadState::Waiting,
            },
        );
        self.pending.push_back(filename.to_string());
        Requested::Queued
    }

    /// Move pending requests into flight, oldest first, until the limit is reached.
    pub fn admit(&mut self) -> Vec<Admission> {
        let mut admitted = Vec::new();
        while self.admitted < self.limit {
            let Some(filename) = self.pending.pop_front() else {
                break;
            };
            let Some(load) = self.requests.get_mut(&filename) else {
                continue;
            };
            load.state = LoadState::InFlight { epoch: self.epoch };
            self.admitted += 1;
            admitted.push(Admission {
                poster_index: load.poster_index,
                filename,
            });
        }
        admitted
    }

    /// Record the resolved surface and return every waiter attached to the
    /// request, in attachment order. The cached surface wins if one exists.
    pub fn complete(&mut self, filename: &str, surface: Arc<Surface>) -> (Arc<Surface>, Vec<W>) {
        let surface = self.cache.insert(filename, surface);
        (surface, self.abandon(filename))
    }

    /// Give up on an in-flight request without caching anything, freeing its
    /// slot. Returns its waiters so they can be answered some other way.
    pub fn abandon(&mut self, filename: &str) -> Vec<W> {
        let Some(load) = self.requests.remove(filename) else {
            return Vec::new();
        };
        match load.state {
            LoadState::InFlight { epoch } if epoch == self.epoch => {
                self.admitted = self.admitted.saturating_sub(1);
            }
            LoadState::InFlight { .. } => {}
            LoadState::Waiting => {
                self.pending.retain(|f| f != filename);
            }
        }
        load.waiters
    }

    /// Drop every request still waiting for a slot and zero the admission
    /// count. In-flight requests keep their waiters and still complete. The
    /// cache is untouched. Returns the dropped requests in pending order.
    pub fn reset(&mut self) -> Vec<Dropped<W>> {
        let mut discarded = Vec::new();
        for filename in self.pending.drain(..) {
            if let Some(load) = self.requests.remove(&filename) {
                discarded.push(Dropped {
                    filename,
                    poster_index: load.poster_index,
                    waiters: load.waiters,
                });
            }
        }
        self.admitted = 0;
        self.epoch += 1;
        discarded
    }

    /// Requests holding a slot in the current epoch.
    pub fn in_flight(&self) -> usize {
        self.admitted
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn cached(&self, filename: &str) -> Option<Arc<Surface>> {
        self.cache.get(filename)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_outstanding(&self, filename: &str) -> bool {
        self.requests.contains_key(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn surface() -> Arc<Surface> {
        Arc::new(Surface::from_asset(RgbaImage::new(3, 4)))
    }

    fn names(admissions: &[Admission]) -> Vec<&str> {
        admissions.iter().map(|a| a.filename.as_str()).collect()
    }

    #[test]
    fn admits_in_arrival_order_with_single_slot() {
        let mut q = LoadQueue::new(1);
        for (i, f) in ["a", "b", "c"].into_iter().enumerate() {
            assert!(matches!(q.request(f, i, i), Requested::Queued));
        }
        assert_eq!(names(&q.admit()), ["a"]);
        assert!(q.admit().is_empty());

        let (_, waiters) = q.complete("a", surface());
        assert_eq!(waiters, vec![0]);
        assert_eq!(names(&q.admit()), ["b"]);
        q.complete("b", surface());
        assert_eq!(names(&q.admit()), ["c"]);
    }

    #[test]
    fn duplicates_attach_without_reordering() {
        let mut q = LoadQueue::new(1);
        q.request("a", 0, "first");
        q.request("b", 1, "b");
        assert!(matches!(q.request("b", 1, "b-again"), Requested::Attached));
        assert!(matches!(q.request("a", 0, "second"), Requested::Attached));
        assert_eq!(q.pending_len(), 2);

        assert_eq!(names(&q.admit()), ["a"]);
        // in flight dedups as well
        assert!(matches!(q.request("a", 0, "third"), Requested::Attached));
        let (_, waiters) = q.complete("a", surface());
        assert_eq!(waiters, vec!["first", "second", "third"]);

        assert_eq!(names(&q.admit()), ["b"]);
        let (_, waiters) = q.complete("b", surface());
        assert_eq!(waiters, vec!["b", "b-again"]);
    }

    #[test]
    fn cached_filename_resolves_without_queueing() {
        let mut q = LoadQueue::new(2);
        q.request("a", 0, ());
        q.admit();
        let (stored, _) = q.complete("a", surface());

        match q.request("a", 0, ()) {
            Requested::Cached(hit, ()) => assert!(Arc::ptr_eq(&hit, &stored)),
            other => panic!("expected cache hit, got {other:?}"),
        }
        assert_eq!(q.pending_len(), 0);
        assert_eq!(q.in_flight(), 0);
        assert!(!q.is_outstanding("a"));
    }

    #[test]
    fn never_more_than_limit_in_flight() {
        let mut q = LoadQueue::new(3);
        for i in 0..10 {
            q.request(&format!("p{i}"), i, i);
        }
        let first = q.admit();
        assert_eq!(first.len(), 3);
        assert_eq!(q.in_flight(), 3);
        assert_eq!(q.pending_len(), 7);

        let mut done = 0;
        let mut running: VecDeque<_> = first.into_iter().collect();
        while let Some(next) = running.pop_front() {
            q.complete(&next.filename, surface());
            done += 1;
            running.extend(q.admit());
            assert!(q.in_flight() <= 3);
        }
        assert_eq!(done, 10);
        assert_eq!(q.cached_len(), 10);
    }

    #[test]
    fn abandon_frees_the_slot_without_caching() {
        let mut q = LoadQueue::new(1);
        q.request("a", 0, "a");
        q.request("a", 0, "a2");
        q.request("b", 1, "b");
        assert_eq!(names(&q.admit()), ["a"]);

        assert_eq!(q.abandon("a"), vec!["a", "a2"]);
        assert_eq!(q.in_flight(), 0);
        assert!(q.cached("a").is_none());
        assert_eq!(names(&q.admit()), ["b"]);

        // A later request for the abandoned filename is queued afresh.
        assert!(matches!(q.request("a", 0, "a3"), Requested::Queued));
    }

    #[test]
    fn reset_discards_pending_and_ignores_stale_completions() {
        let mut q = LoadQueue::new(1);
        q.request("a", 0, "a");
        q.request("b", 1, "b");
        q.request("b", 1, "b2");
        assert_eq!(names(&q.admit()), ["a"]);

        let discarded = q.reset();
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].filename, "b");
        assert_eq!(discarded[0].poster_index, 1);
        assert_eq!(discarded[0].waiters, vec!["b", "b2"]);
        assert!(!q.is_outstanding("b"));
        assert_eq!(q.in_flight(), 0);
        assert_eq!(q.pending_len(), 0);

        q.request("c", 2, "c");
        assert_eq!(names(&q.admit()), ["c"]);
        assert_eq!(q.in_flight(), 1);

        // "a" was admitted before the reset: its waiters still resolve,
        // but it must not free the slot "c" holds.
        let (_, waiters) = q.complete("a", surface());
        assert_eq!(waiters, vec!["a"]);
        assert_eq!(q.in_flight(), 1);
        assert!(q.cached("a").is_some());

        q.complete("c", surface());
        assert_eq!(q.in_flight(), 0);
    }
}
