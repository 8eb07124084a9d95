use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::domain::RequestResult;

/// The single channel every VU sends its `RequestResult`s into, fanned
/// out to an optional secondary tap (§4.6). The primary send always
/// backpressures the VU per §4.3/§5; the tap is best-effort — a full or
/// absent tap never slows or blocks a VU, since it exists only to feed a
/// phase's own T-Digest, not to carry the authoritative counts.
#[derive(Clone)]
pub(super) struct ResultsSink {
    primary: mpsc::Sender<RequestResult>,
    tap: Arc<Mutex<Option<mpsc::Sender<RequestResult>>>>,
}

impl ResultsSink {
    pub(super) fn new(primary: mpsc::Sender<RequestResult>) -> Self {
        Self {
            primary,
            tap: Arc::new(Mutex::new(None)),
        }
    }

    /// Install or clear the secondary tap a `StressController` tees phase
    /// results into. Replaces whatever tap was previously installed.
    pub(super) fn set_tap(&self, tap: Option<mpsc::Sender<RequestResult>>) {
        let mut guard = self.tap.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = tap;
    }

    pub(super) async fn send(&self, result: RequestResult) -> Result<(), mpsc::error::SendError<RequestResult>> {
        let tapped = {
            let guard = self.tap.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            guard.clone()
        };
        if let Some(tap_tx) = tapped {
            let _ignored = tap_tx.try_send(result.clone());
        }
        self.primary.send(result).await
    }
}
