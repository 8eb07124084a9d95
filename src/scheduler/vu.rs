use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use crate::http::{HttpExecutor, PreparedRequest, Transport};

use super::tee::ResultsSink;

/// One cooperative virtual-user task (§4.3): loops over `requests` in
/// order, sending exactly one `RequestResult` per attempted request.
/// `stop` is checked between requests, never mid-request — a VU always
/// finishes the request it is currently executing (graceful
/// cancellation, §4.5).
pub(super) struct VirtualUser<T: Transport> {
    pub(super) vu_id: u64,
    pub(super) executor: Arc<HttpExecutor<T>>,
    pub(super) requests: Arc<Vec<PreparedRequest>>,
    pub(super) think_time_ms: u64,
    pub(super) iterations: u64,
    pub(super) results_tx: ResultsSink,
    pub(super) stop: watch::Receiver<bool>,
}

impl<T: Transport> VirtualUser<T> {
    pub(super) async fn run(self) {
        let mut iter_count: u64 = 0;
        loop {
            if *self.stop.borrow() {
                return;
            }
            if self.iterations > 0 && iter_count >= self.iterations {
                return;
            }

            for request in self.requests.iter() {
                if *self.stop.borrow() {
                    return;
                }

                let result = self.executor.execute(request, self.vu_id).await;
                // The results channel is bounded (§4.3): a full channel
                // backpressures this send, which is the mechanism that
                // caps effective TPS when the consumer falls behind. A
                // VU never drops a result to avoid waiting.
                if self.results_tx.send(result).await.is_err() {
                    return;
                }

                if self.think_time_ms > 0 {
                    sleep(Duration::from_millis(self.think_time_ms)).await;
                }
            }

            iter_count = iter_count.saturating_add(1);
        }
    }
}
