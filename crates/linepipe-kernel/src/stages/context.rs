//! Cancellation and deadline handle passed to every stage.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::StageError;

/// Cancellation state shared by every stage of one run.
///
/// Stages poll [`StageContext::check`] between lines; nothing here interrupts
/// a read or write that is already in progress.
#[derive(Debug, Clone, Default)]
pub struct StageContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl StageContext {
    /// A context that is never cancelled unless [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. one cancelled by a Ctrl-C handler.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Add a deadline. An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Add a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail if the run was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), StageError> {
        if self.token.is_cancelled() {
            return Err(StageError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(StageError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_passes() {
        assert!(StageContext::new().check().is_ok());
    }

    #[test]
    fn test_cancel_is_seen_by_clones() {
        let ctx = StageContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(matches!(clone.check(), Err(StageError::Cancelled)));
    }

    #[tokio::test]
    async fn test_elapsed_deadline() {
        let ctx = StageContext::new().with_timeout(Duration::ZERO);
        assert!(matches!(ctx.check(), Err(StageError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = StageContext::new()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
    }
}
