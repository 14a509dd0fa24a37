//! Cancellation shared by every request of a provider instance

use std::future::Future;

use tokio::sync::watch;

use super::error::{ArmError, ArmResult};

/// Fires a [`StopContext`]
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Cancellation context carried into each remote call
#[derive(Debug, Clone)]
pub struct StopContext {
    rx: watch::Receiver<bool>,
}

impl StopContext {
    pub fn new() -> (StopHandle, StopContext) {
        let (tx, rx) = watch::channel(false);
        (StopHandle { tx }, StopContext { rx })
    }

    /// A context that never fires
    pub fn background() -> StopContext {
        let (handle, ctx) = Self::new();
        // Receivers observe the last value even after the sender is gone
        drop(handle);
        ctx
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the context has been stopped; pends forever otherwise
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Run a request future unless the context fires first
    pub async fn run<T, F>(&self, fut: F) -> ArmResult<T>
    where
        F: Future<Output = ArmResult<T>>,
    {
        if self.is_stopped() {
            return Err(ArmError::Cancelled);
        }
        tokio::select! {
            result = fut => result,
            _ = self.stopped() => Err(ArmError::Cancelled),
        }
    }
}

impl Default for StopContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_to_completion_when_not_stopped() {
        let ctx = StopContext::background();
        let result = ctx.run(async { Ok::<_, ArmError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn already_stopped_context_rejects_requests() {
        let (handle, ctx) = StopContext::new();
        handle.stop();
        let result = ctx.run(async { Ok::<_, ArmError>(1) }).await;
        assert!(matches!(result, Err(ArmError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_cancels_in_flight_request() {
        let (handle, ctx) = StopContext::new();
        let request = tokio::spawn(async move {
            ctx.run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, ArmError>(())
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.stop();

        let result = request.await.unwrap();
        assert!(matches!(result, Err(ArmError::Cancelled)));
    }
}
