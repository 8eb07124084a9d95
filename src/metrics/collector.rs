use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{Aggregate, RequestResult};
use crate::error::{MetricsError, MetricsResult};

use super::state::MetricsState;

/// How many results the consumer drains per wakeup before yielding back
/// to the runtime, bounding a single poll's latency under heavy load
/// (§4.4).
const DRAIN_BATCH_SIZE: usize = 512;

/// Cached-snapshot freshness window (§4.4): repeated reads inside this
/// window reuse the last computed `Aggregate` instead of re-walking
/// every endpoint and bucket.
pub const SNAPSHOT_TTL: Duration = Duration::from_millis(500);

/// Handle to a running metrics-consumer task: a cheap, cloneable watch
/// receiver for the latest published snapshot, plus the task's join
/// handle for awaiting its final aggregate at run end.
pub struct MetricsHandle {
    snapshots: watch::Receiver<Aggregate>,
    join: JoinHandle<Aggregate>,
}

impl MetricsHandle {
    /// Clone of the most recently published snapshot. Never blocks.
    #[must_use]
    pub fn latest(&self) -> Aggregate {
        self.snapshots.borrow().clone()
    }

    /// A receiver that wakes whenever a fresh snapshot is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Aggregate> {
        self.snapshots.clone()
    }

    /// Await the consumer task's shutdown and return its final
    /// aggregate, computed with `include_response_times = true`.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::ConsumerJoin` if the task panicked.
    pub async fn join(self) -> MetricsResult<Aggregate> {
        self.join
            .await
            .map_err(|source| MetricsError::ConsumerJoin { source })
    }
}

/// Spawn the single-consumer aggregation task described in §4.4: drains
/// `results` in batches, folds each into `MetricsState`, and republishes
/// a snapshot on `snapshots` no more often than `SNAPSHOT_TTL`. Exits
/// once every producer (`results` sender) has been dropped, returning a
/// final full snapshot.
#[must_use]
pub fn spawn_consumer(
    mut results: mpsc::Receiver<RequestResult>,
    run_start: Instant,
    run_start_ns: u64,
) -> MetricsHandle {
    let mut state = MetricsState::new(run_start_ns);
    let (tx, rx) = watch::channel(Aggregate::default());

    let join = tokio::spawn(async move {
        let mut last_publish = Instant::now() - SNAPSHOT_TTL;
        let mut batch = Vec::with_capacity(DRAIN_BATCH_SIZE);

        loop {
            let received = results.recv_many(&mut batch, DRAIN_BATCH_SIZE).await;
            if received == 0 {
                break;
            }
            for result in batch.drain(..) {
                state.fold(&result);
            }

            if last_publish.elapsed() >= SNAPSHOT_TTL {
                let snapshot = state.full_aggregate(run_start.elapsed(), false);
                debug!(total = snapshot.total_requests, "published metrics snapshot");
                let _ignored = tx.send(snapshot);
                last_publish = Instant::now();
            }
        }

        let final_snapshot = state.full_aggregate(run_start.elapsed(), true);
        info!(
            total = final_snapshot.total_requests,
            errors = final_snapshot.failures,
            late_redirects = state.late_result_redirects,
            "metrics consumer drained"
        );
        let _ignored = tx.send(final_snapshot.clone());
        final_snapshot
    });

    MetricsHandle { snapshots: rx, join }
}
