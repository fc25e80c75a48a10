//! Cancellable delayed tasks on the tokio clock.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A future scheduled to run after a delay.
///
/// Dropping the handle does not cancel the task; call [`DelayedTask::cancel`]
/// for that. Cancellation also interrupts the future at its next await point,
/// so multi-stage work stops between stages.
#[derive(Debug)]
pub struct DelayedTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl DelayedTask {
    /// Spawn `work` to run after `delay`.
    pub fn spawn<Fut>(delay: Duration, work: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let stop = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = stop.cancelled() => {}
                () = async move {
                    tokio::time::sleep(delay).await;
                    work.await;
                } => {}
            }
        });
        Self { token, handle }
    }

    /// Cancel the task if it has not finished yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
