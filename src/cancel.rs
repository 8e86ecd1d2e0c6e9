//! Cooperative cancellation and deadlines for fetch operations.
//!
//! A [`CancelHandle`] and its [`CancelToken`]s are created together with
//! [`cancel_pair`]. Tokens are cheap to clone and can additionally carry a
//! deadline; whichever fires first cancels the operation.

use tokio::sync::watch;
use tokio::time::Instant;

/// Triggers cancellation for every token created from the same pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by in-flight operations.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Create a handle and a token wired to it.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx, deadline: None })
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::never()
    }
}

impl CancelToken {
    /// A token that is never cancelled and has no deadline.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx, deadline: None }
    }

    /// The same token, also cancelled once `deadline` passes.
    ///
    /// An existing earlier deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        if *self.rx.borrow() {
            return true;
        }
        self.deadline
            .map(|d| Instant::now() >= d)
            .unwrap_or(false)
    }

    /// Resolves once the token is cancelled or its deadline passes.
    ///
    /// Never resolves for [`CancelToken::never`].
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let signal = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Handle dropped without cancelling.
                    std::future::pending::<()>().await;
                }
            }
        };
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = signal => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => signal.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let (handle, token) = cancel_pair();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        assert!(!token.is_cancelled());
        handle.cancel();
        waiter.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled_resolves_immediately() {
        let (handle, token) = cancel_pair();
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("should resolve");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let token = CancelToken::never().with_deadline(Instant::now() + Duration::from_millis(100));
        assert!(!token.is_cancelled());
        token.cancelled().await;
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_resolve() {
        let token = CancelToken::never();
        let res = tokio::time::timeout(Duration::from_secs(60), token.cancelled()).await;
        assert!(res.is_err());
    }

    #[test]
    fn test_earlier_deadline_kept() {
        let now = Instant::now();
        let token = CancelToken::never()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(5));
        assert_eq!(token.deadline(), Some(now + Duration::from_secs(1)));
    }
}
