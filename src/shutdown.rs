use tokio::sync::watch;
use tracing::info;

/// Run-wide interrupt flag.
///
/// One Ctrl-C listener is registered at startup, before any other work,
/// so an interrupt at any point in the run resolves every pending
/// [`Shutdown::cancelled`] wait and the orderly cleanup path (summary,
/// browser release, cache removal) still executes instead of the
/// process terminating outright.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Starts the background Ctrl-C listener.
    pub fn listen() -> Self {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                let _ = tx.send(true);
            }
        });
        Self { rx }
    }

    /// Completes once an interrupt has been requested; immediately when
    /// it already happened. Pends forever when no interrupt ever comes.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    #[cfg(test)]
    fn manual() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_resolves_after_the_flag_is_raised() {
        let (tx, shutdown) = Shutdown::manual();

        tx.send(true).unwrap();
        // Must not hang; a timeout guards against a missed wakeup.
        tokio::time::timeout(Duration::from_secs(1), shutdown.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_preempts_a_never_ending_wait() {
        let (tx, shutdown) = Shutdown::manual();

        tokio::spawn(async move {
            let _ = tx.send(true);
        });

        let interrupted = tokio::select! {
            () = shutdown.cancelled() => true,
            () = std::future::pending::<()>() => false,
        };
        assert!(interrupted);
    }

    #[tokio::test]
    async fn every_clone_observes_the_interrupt() {
        let (tx, shutdown) = Shutdown::manual();
        let other = shutdown.clone();

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), shutdown.cancelled())
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), other.cancelled())
            .await
            .unwrap();
    }
}
