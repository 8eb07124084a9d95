use tokio::sync::broadcast;

/// Run-level hard-cancellation signal (§4.5): distinct from the
/// scheduler's per-VU graceful stop watch, this is the "abort everything
/// now" path — fired when the run's deadline elapses or a caller cancels
/// outright. Thin wrapper over `tokio::sync::broadcast`, exposed as a
/// library seam any caller can wire to a signal handler, a deadline, or
/// a test.
#[derive(Debug, Clone)]
pub struct ShutdownSender {
    inner: broadcast::Sender<()>,
}

#[derive(Debug)]
pub struct ShutdownReceiver {
    inner: broadcast::Receiver<()>,
}

impl ShutdownSender {
    #[must_use]
    pub fn new() -> Self {
        let (inner, _) = broadcast::channel(1);
        Self { inner }
    }

    #[must_use]
    pub fn subscribe(&self) -> ShutdownReceiver {
        ShutdownReceiver {
            inner: self.inner.subscribe(),
        }
    }

    /// Fire the shutdown signal. Idempotent: additional calls after every
    /// receiver has already observed one are a no-op.
    pub fn fire(&self) {
        let _ignored = self.inner.send(());
    }
}

impl Default for ShutdownSender {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownReceiver {
    /// Resolves once `fire` has been called (or the sender and every
    /// other receiver have been dropped).
    pub async fn recv(&mut self) {
        let _ignored = self.inner.recv().await;
    }

    #[must_use]
    pub fn has_fired(&mut self) -> bool {
        matches!(self.inner.try_recv(), Ok(()) | Err(broadcast::error::TryRecvError::Closed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receiver_observes_fire() {
        let sender = ShutdownSender::new();
        let mut receiver = sender.subscribe();
        sender.fire();
        receiver.recv().await;
    }

    #[tokio::test]
    async fn multiple_receivers_all_observe_one_fire() {
        let sender = ShutdownSender::new();
        let mut a = sender.subscribe();
        let mut b = sender.subscribe();
        sender.fire();
        a.recv().await;
        b.recv().await;
    }

    #[test]
    fn has_fired_is_false_before_any_signal() {
        let sender = ShutdownSender::new();
        let mut receiver = sender.subscribe();
        assert!(!receiver.has_fired());
    }
}
