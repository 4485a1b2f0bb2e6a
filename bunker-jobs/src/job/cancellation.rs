use tokio::sync::oneshot;

/// Why a running backup job is being asked to stop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Reason {
    Shutdown,
    Operator,
}

/// Scheduler-side handle for stopping a running backup job.
#[derive(Debug)]
pub struct Handle {
    request: oneshot::Sender<Reason>,
    stopped: oneshot::Receiver<()>,
}

impl Handle {
    /// Asks the job to stop and waits until it has aborted its copy loop and
    /// run scoped cleanup: once this resolves, the scratch files are gone and
    /// the manifest pointer was left untouched.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(self, reason: Reason) {
        if self.request.send(reason).is_err() {
            tracing::debug!("job already finished, nothing to cancel");
            return;
        }
        if self.stopped.await.is_err() {
            tracing::debug!("job dropped before confirming it stopped");
        }
    }
}

/// Job-side end of the cancellation handshake.
#[derive(Debug)]
pub struct Listener {
    request: oneshot::Receiver<Reason>,
    stopped: Option<oneshot::Sender<()>>,
}

impl Listener {
    /// Resolves when cancellation is requested. Pends forever if the
    /// scheduler dropped its handle, so a `select!` against this never
    /// completes spuriously.
    pub async fn requested(&mut self) -> Reason {
        match (&mut self.request).await {
            Ok(reason) => reason,
            Err(error) => {
                tracing::debug!(%error, "cancellation handle dropped, job will never be cancelled");
                futures::future::pending().await
            }
        }
    }

    /// Confirms to the requester that the job has stopped and its scoped
    /// cleanup has run.
    pub fn confirm_stopped(mut self) {
        if let Some(stopped) = self.stopped.take() {
            if stopped.send(()).is_err() {
                tracing::warn!("cancellation handle dropped before confirmation");
            }
        }
    }
}

pub fn pair() -> (Handle, Listener) {
    let (request_send, request_recv) = oneshot::channel();
    let (stopped_send, stopped_recv) = oneshot::channel();
    (
        Handle {
            request: request_send,
            stopped: stopped_recv,
        },
        Listener {
            request: request_recv,
            stopped: Some(stopped_send),
        },
    )
}
