//! Interval-driven snapshot refresh with a stale-but-available policy.
//!
//! The poller owns one [`FeedState`] cell and publishes it through a
//! `watch` channel. Every fetch carries a sequence number; a response is
//! applied only if it is newer than the last applied one, so a slow
//! request can never overwrite fresher data. A failed fetch keeps the
//! previous snapshot and records the error. Cancelling (or dropping the
//! [`Poller`]) stops the timer and drops any in-flight result.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::Snapshot;
use crate::telemetry::SnapshotSource;

#[derive(Debug, Clone)]
pub struct FeedState {
    pub snapshot: Arc<Snapshot>,
    /// Message from the most recent failed fetch, cleared on success
    pub error: Option<String>,
    /// True until the first fetch settles
    pub loading: bool,
    pub applied_seq: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(Snapshot::default()),
            error: None,
            loading: true,
            applied_seq: 0,
            last_updated: None,
        }
    }
}

impl FeedState {
    /// Apply the outcome of request `seq`. Returns false if it was stale.
    pub fn apply(&mut self, seq: u64, outcome: Result<Snapshot>) -> bool {
        if seq <= self.applied_seq {
            return false;
        }

        self.applied_seq = seq;
        self.loading = false;
        match outcome {
            Ok(snapshot) => {
                self.snapshot = Arc::new(snapshot);
                self.error = None;
                self.last_updated = Some(Utc::now());
            }
            Err(err) => {
                self.error = Some(err.to_string());
            }
        }
        true
    }
}

pub struct Poller {
    state_rx: watch::Receiver<FeedState>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Poller {
    /// Start polling. The first fetch is issued immediately.
    pub fn spawn(source: Arc<dyn SnapshotSource>, interval: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(FeedState::default());
        let token = CancellationToken::new();
        let task = tokio::spawn(run(source, interval, state_tx, token.clone()));

        Self { state_rx, token, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state_rx.clone()
    }

    /// Latest published state
    pub fn current(&self) -> FeedState {
        self.state_rx.borrow().clone()
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}

async fn run(
    source: Arc<dyn SnapshotSource>,
    interval: Duration,
    state_tx: watch::Sender<FeedState>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: JoinSet<(u64, Result<Snapshot>)> = JoinSet::new();
    let mut next_seq: u64 = 0;

    tracing::info!(interval_ms = interval.as_millis() as u64, "poller started");

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                in_flight.abort_all();
                break;
            }

            _ = ticker.tick() => {
                next_seq += 1;
                let seq = next_seq;
                let source = source.clone();
                in_flight.spawn(async move { (seq, source.fetch_snapshot().await) });
            }

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                let (seq, outcome) = match joined {
                    Ok(done) => done,
                    Err(err) => {
                        if !err.is_cancelled() {
                            tracing::error!("fetch task panicked: {}", err);
                        }
                        continue;
                    }
                };

                if let Err(err) = &outcome {
                    tracing::warn!(seq, "failed to fetch data, keeping last snapshot: {}", err);
                }

                let applied = state_tx.send_if_modified(|state| state.apply(seq, outcome));
                if applied {
                    tracing::debug!(seq, "snapshot applied");
                } else {
                    tracing::debug!(seq, "discarded stale response");
                }
            }
        }
    }

    tracing::info!("poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{Animal, AnimalKind, AnimalStatus, Location};
    use crate::telemetry::MockSnapshotSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn animal(id: u32) -> Animal {
        Animal {
            id,
            collar_id: format!("C{}", id),
            herd_id: 1,
            name: format!("Animal {}", id),
            status: AnimalStatus::Healthy,
            alert: None,
            location: Location { lat: 0.0, lng: 0.0 },
            temperature: 38.5,
            steps: 100,
            kind: AnimalKind::Cow,
            breed: "Nelore".to_string(),
            age: 24,
            weight: 400.0,
            history: None,
        }
    }

    fn snapshot_of(n: u32) -> Snapshot {
        Snapshot {
            animals: (1..=n).map(animal).collect(),
            herds: Vec::new(),
        }
    }

    /// First call is slow, every later call answers at once
    struct SlowFirstSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotSource for SlowFirstSource {
        async fn fetch_snapshot(&self) -> Result<Snapshot> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(snapshot_of(1))
            } else {
                Ok(snapshot_of(2))
            }
        }
    }

    #[test]
    fn test_apply_discards_older_sequence() {
        let mut state = FeedState::default();
        assert!(state.apply(2, Ok(snapshot_of(2))));
        assert!(!state.apply(1, Ok(snapshot_of(1))));
        assert_eq!(state.snapshot.animals.len(), 2);
        assert!(!state.apply(2, Err(Error::Status(500))));
        assert!(state.error.is_none());
    }

    #[test]
    fn test_failure_keeps_snapshot_and_success_clears_error() {
        let mut state = FeedState::default();
        state.apply(1, Ok(snapshot_of(3)));
        let before = state.snapshot.clone();

        assert!(state.apply(2, Err(Error::Status(503))));
        assert_eq!(state.snapshot, before);
        assert_eq!(state.error.as_deref(), Some("HTTP error! status: 503"));
        assert!(!state.loading);

        state.apply(3, Ok(snapshot_of(1)));
        assert!(state.error.is_none());
        assert_eq!(state.snapshot.animals.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_is_immediate() {
        let mut source = MockSnapshotSource::new();
        source.expect_fetch_snapshot().returning(|| Ok(snapshot_of(3)));

        let poller = Poller::spawn(Arc::new(source), Duration::from_secs(2));
        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();

        let state = poller.current();
        assert!(!state.loading);
        assert_eq!(state.applied_seq, 1);
        assert_eq!(state.snapshot.animals.len(), 3);
        assert!(state.last_updated.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_retains_previous_arrays() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut source = MockSnapshotSource::new();
        source.expect_fetch_snapshot().returning(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(snapshot_of(2))
            } else {
                Err(Error::Status(500))
            }
        });

        let poller = Poller::spawn(Arc::new(source), Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(4500)).await;

        let state = poller.current();
        assert!(calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(state.snapshot.animals.len(), 2);
        assert!(state.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_does_not_overwrite_newer() {
        let source = Arc::new(SlowFirstSource { calls: AtomicUsize::new(0) });
        let poller = Poller::spawn(source, Duration::from_secs(2));

        tokio::time::sleep(Duration::from_millis(6500)).await;

        let state = poller.current();
        assert_eq!(state.snapshot.animals.len(), 2);
        assert!(state.applied_seq >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fetch_or_update_after_shutdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut source = MockSnapshotSource::new();
        source.expect_fetch_snapshot().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(snapshot_of(1))
        });

        let poller = Poller::spawn(Arc::new(source), Duration::from_secs(2));
        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();

        poller.shutdown();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(poller.current().applied_seq, 1);
        // The run loop has exited and dropped its sender
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_result_dropped_on_teardown() {
        let source = Arc::new(SlowFirstSource { calls: AtomicUsize::new(0) });
        let poller = Poller::spawn(source, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(1)).await;

        poller.shutdown();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let state = poller.current();
        assert!(state.loading);
        assert_eq!(state.applied_seq, 0);
        assert!(state.snapshot.animals.is_empty());
    }
}
