//! Crawl lifecycle, quiescence tracking and the idle monitor
//!
//! Quiescence is tracked with an in-flight counter: a link counts from the
//! moment it is queued until the worker that popped it has finished with
//! it, including queueing all of its children. Children are counted before
//! their parent is released, so the counter only reaches zero when no link
//! is queued and no worker is busy. Reaching zero wakes the idle monitor,
//! which stops the crawl. The monitor also re-checks on a fixed interval
//! and logs progress while the crawl is busy.

use super::frontier::Frontier;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Where a crawler is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CrawlState {
    /// Constructed, not started
    Idle = 0,
    Running = 1,
    /// Stop requested; queued links drain, nothing new is queued
    Stopping = 2,
    /// Every worker has exited
    Stopped = 3,
}

impl CrawlState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CrawlState::Idle,
            1 => CrawlState::Running,
            2 => CrawlState::Stopping,
            _ => CrawlState::Stopped,
        }
    }
}

/// Shared state driving one crawl from start to stop
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
    in_flight: AtomicUsize,
    quiescent: Notify,
    active: Vec<AtomicBool>,
    pub(crate) frontier: Frontier,
}

impl Lifecycle {
    pub(crate) fn new(frontier: Frontier, workers: usize) -> Self {
        Self {
            state: AtomicU8::new(CrawlState::Idle as u8),
            in_flight: AtomicUsize::new(0),
            quiescent: Notify::new(),
            active: (0..workers).map(|_| AtomicBool::new(false)).collect(),
            frontier,
        }
    }

    pub(crate) fn state(&self) -> CrawlState {
        CrawlState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Move from `Idle` to `Running`. False if the crawler was already used.
    pub(crate) fn begin(&self) -> bool {
        self.state
            .compare_exchange(
                CrawlState::Idle as u8,
                CrawlState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Move to `Stopping` and close the frontier. True on the first call only.
    pub(crate) fn request_stop(&self) -> bool {
        let mut current = self.state.load(Ordering::SeqCst);
        loop {
            if current >= CrawlState::Stopping as u8 {
                return false;
            }
            match self.state.compare_exchange(
                current,
                CrawlState::Stopping as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        self.frontier.close();
        // Wake the monitor so it can exit
        self.quiescent.notify_one();
        true
    }

    pub(crate) fn finish(&self) {
        self.state.store(CrawlState::Stopped as u8, Ordering::SeqCst);
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.state.load(Ordering::SeqCst) >= CrawlState::Stopping as u8
    }

    pub(crate) fn work_added(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn work_done(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.quiescent.notify_one();
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn set_active(&self, worker: usize, active: bool) {
        if let Some(flag) = self.active.get(worker) {
            flag.store(active, Ordering::SeqCst);
        }
    }

    pub(crate) fn active_workers(&self) -> usize {
        self.active
            .iter()
            .filter(|flag| flag.load(Ordering::SeqCst))
            .count()
    }

    /// No link is queued, being processed, or about to be queued
    pub(crate) fn is_quiescent(&self) -> bool {
        self.in_flight() == 0 && self.active_workers() == 0 && self.frontier.is_empty()
    }

    /// Every worker is busy and the frontier is full, so any worker that
    /// needs to queue a link is waiting for a slot nobody will free
    pub(crate) fn is_saturated(&self) -> bool {
        self.in_flight() > 0
            && self.active_workers() == self.active.len()
            && self.frontier.len() >= self.frontier.capacity()
    }
}

/// Marks a worker busy with one link; releases the link's in-flight slot on drop
pub(crate) struct ActivityGuard<'a> {
    lifecycle: &'a Lifecycle,
    worker: usize,
}

impl<'a> ActivityGuard<'a> {
    pub(crate) fn new(lifecycle: &'a Lifecycle, worker: usize) -> Self {
        lifecycle.set_active(worker, true);
        Self { lifecycle, worker }
    }
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.set_active(self.worker, false);
        self.lifecycle.work_done();
    }
}

/// Requests a graceful stop of a running crawl from anywhere
#[derive(Debug, Clone)]
pub struct StopHandle {
    lifecycle: Arc<Lifecycle>,
}

impl StopHandle {
    pub(crate) fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    /// Stop accepting new links and let queued ones drain. Idempotent.
    pub fn stop(&self) {
        if self.lifecycle.request_stop() {
            info!("Received signal to stop... Will finish queued links.");
        }
    }

    pub fn state(&self) -> CrawlState {
        self.lifecycle.state()
    }
}

/// Watches a running crawl and stops it once it goes quiet
pub(crate) struct IdleMonitor {
    lifecycle: Arc<Lifecycle>,
    interval: Duration,
}

impl IdleMonitor {
    pub(crate) fn new(lifecycle: Arc<Lifecycle>, interval: Duration) -> Self {
        Self { lifecycle, interval }
    }

    pub(crate) async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick completes immediately
        ticker.tick().await;

        let mut saturated_ticks = 0u32;

        loop {
            let ticked = tokio::select! {
                _ = self.lifecycle.quiescent.notified() => false,
                _ = ticker.tick() => true,
            };

            if self.lifecycle.is_stopping() {
                return;
            }

            if self.lifecycle.is_quiescent() {
                info!("No urls to parse, exiting.");
                self.lifecycle.request_stop();
                return;
            }

            if ticked {
                if self.lifecycle.is_saturated() {
                    saturated_ticks += 1;
                    if saturated_ticks == 2 {
                        warn!(
                            capacity = self.lifecycle.frontier.capacity(),
                            "Every worker is blocked on a full frontier; raise url-buffer-size or stop the crawl"
                        );
                    }
                } else {
                    saturated_ticks = 0;
                }
            }

            debug!(
                in_flight = self.lifecycle.in_flight(),
                active = self.lifecycle.active_workers(),
                queued = self.lifecycle.frontier.len(),
                "Crawl still busy"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Link;

    fn lifecycle(workers: usize) -> Arc<Lifecycle> {
        Arc::new(Lifecycle::new(Frontier::new(8), workers))
    }

    #[test]
    fn test_state_transitions() {
        let lc = lifecycle(1);
        assert_eq!(lc.state(), CrawlState::Idle);

        assert!(lc.begin());
        assert!(!lc.begin());
        assert_eq!(lc.state(), CrawlState::Running);

        assert!(lc.request_stop());
        assert!(!lc.request_stop());
        assert_eq!(lc.state(), CrawlState::Stopping);
        assert!(lc.frontier.is_closed());

        lc.finish();
        assert_eq!(lc.state(), CrawlState::Stopped);
        assert!(lc.is_stopping());
    }

    #[test]
    fn test_stop_before_start_prevents_begin() {
        let lc = lifecycle(1);
        StopHandle::new(Arc::clone(&lc)).stop();
        assert_eq!(lc.state(), CrawlState::Stopping);
        assert!(!lc.begin());
    }

    #[test]
    fn test_activity_guard_releases_work() {
        let lc = lifecycle(2);
        lc.work_added();
        assert!(!lc.is_quiescent());

        {
            let _guard = ActivityGuard::new(&lc, 1);
            assert_eq!(lc.active_workers(), 1);
            assert_eq!(lc.in_flight(), 1);
        }

        assert_eq!(lc.active_workers(), 0);
        assert_eq!(lc.in_flight(), 0);
        assert!(lc.is_quiescent());
    }

    #[tokio::test]
    async fn test_saturated_needs_busy_workers_and_full_frontier() {
        let lc = Arc::new(Lifecycle::new(Frontier::new(1), 1));
        assert!(!lc.is_saturated());

        lc.work_added();
        lc.frontier.push(Link::new("start", "https://a.test/")).await.unwrap();
        assert!(!lc.is_saturated());

        let guard = ActivityGuard::new(&lc, 0);
        lc.work_added();
        assert!(lc.is_saturated());

        drop(guard);
        assert!(!lc.is_saturated());
    }

    #[tokio::test]
    async fn test_monitor_stops_when_work_drains() {
        let lc = lifecycle(1);
        assert!(lc.begin());
        lc.work_added();

        let monitor = tokio::spawn(IdleMonitor::new(Arc::clone(&lc), Duration::from_secs(60)).run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(lc.state(), CrawlState::Running);

        lc.work_done();
        tokio::time::timeout(Duration::from_secs(1), monitor)
            .await
            .expect("monitor should react to the notification, not the interval")
            .unwrap();
        assert_eq!(lc.state(), CrawlState::Stopping);
    }

    #[tokio::test]
    async fn test_monitor_exits_on_external_stop() {
        let lc = lifecycle(1);
        assert!(lc.begin());
        lc.work_added();

        let monitor = tokio::spawn(IdleMonitor::new(Arc::clone(&lc), Duration::from_secs(60)).run());
        StopHandle::new(Arc::clone(&lc)).stop();

        tokio::time::timeout(Duration::from_secs(1), monitor)
            .await
            .expect("monitor should exit once stopping")
            .unwrap();
        assert_eq!(lc.in_flight(), 1);
    }
}
