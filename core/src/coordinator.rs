//! Transaction coordinator.
//!
//! [`TransactionCoordinator::run_atomic`] runs a unit of work inside one
//! backend transaction: everything the work does through the scope commits
//! together or not at all. Transient storage failures (contention, deadlock,
//! lock timeout, code collision, pool exhaustion, attempt timeout) rerun the
//! whole unit under the configured [`RetryPolicy`]. Business errors are
//! returned after the first attempt. A commit that fails for any reason
//! other than a serialization failure or deadlock is never retried, since
//! its outcome is unknown.
//!
//! # Example
//!
//! ```ignore
//! let remaining = coordinator
//!     .run_atomic("restock", move |scope| {
//!         Box::pin(InventoryLedger::adjust(scope, event_id, 5))
//!     })
//!     .await?;
//! ```

use crate::error::{StoreError, TicketingError};
use crate::retry::{RetryError, RetryPolicy, retry_with_predicate};
use crate::store::{
    DEFAULT_LOCK_TIMEOUT, DEFAULT_STATEMENT_TIMEOUT, Database, ScopeOptions, TransactionScope,
};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

/// Future returned by a unit of work; borrows the scope for `'a`.
pub type ScopeFuture<'a, T> = BoxFuture<'a, Result<T, TicketingError>>;

/// Default bound on a single attempt, from `begin` through `commit`.
pub const DEFAULT_MAX_DURATION: Duration = DEFAULT_STATEMENT_TIMEOUT;

/// Coordinator tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Backoff and retry bound for transient failures
    pub retry: RetryPolicy,
    /// Longest a single attempt (begin, work and commit) may run before it
    /// is aborted
    pub max_duration: Duration,
    /// Longest a single row-lock wait may take
    pub lock_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_duration: DEFAULT_MAX_DURATION,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Runs units of work atomically against a [`Database`].
#[derive(Clone)]
pub struct TransactionCoordinator {
    database: Arc<dyn Database>,
    config: CoordinatorConfig,
}

impl TransactionCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(database: Arc<dyn Database>, config: CoordinatorConfig) -> Self {
        Self { database, config }
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run `work` inside a transaction, retrying transient failures.
    ///
    /// `work` may be invoked several times, once per attempt, each time with
    /// a fresh scope. It must therefore build its writes from owned inputs
    /// rather than from state left behind by an earlier attempt.
    ///
    /// # Errors
    ///
    /// - Whatever business error `work` returns, after rolling back
    /// - [`TicketingError::RetriesExhausted`] when every attempt failed
    ///   transiently
    /// - [`TicketingError::Storage`] for non-transient backend failures and
    ///   for commits whose outcome is unknown
    pub async fn run_atomic<T, F>(&self, operation: &'static str, work: F) -> Result<T, TicketingError>
    where
        T: Send,
        F: for<'a> Fn(&'a mut dyn TransactionScope) -> ScopeFuture<'a, T> + Send + Sync,
    {
        let work = &work;
        let mut attempt = 0usize;

        let result = retry_with_predicate(
            &self.config.retry,
            move || {
                attempt += 1;
                if attempt > 1 {
                    metrics::counter!("ticketing.transactions.retried", "operation" => operation)
                        .increment(1);
                }
                self.attempt(operation, attempt, work)
            },
            TicketingError::is_retryable,
        )
        .await;

        result.map_err(|err| match err {
            RetryError::Permanent(err) => err,
            RetryError::Exhausted { attempts, last } => match last {
                TicketingError::Transient(store_error) => TicketingError::RetriesExhausted {
                    attempts,
                    last: store_error,
                },
                other => other,
            },
        })
    }

    async fn attempt<T, F>(
        &self,
        operation: &'static str,
        attempt: usize,
        work: &F,
    ) -> Result<T, TicketingError>
    where
        T: Send,
        F: for<'a> Fn(&'a mut dyn TransactionScope) -> ScopeFuture<'a, T> + Send + Sync,
    {
        let deadline = Instant::now() + self.config.max_duration;
        let options = ScopeOptions {
            lock_timeout: self.config.lock_timeout,
            statement_timeout: self.config.max_duration,
        };

        let mut scope = match timeout_at(deadline, self.database.begin(options)).await {
            Ok(scope) => scope?,
            Err(_) => return Err(self.timed_out(operation, attempt)),
        };

        match timeout_at(deadline, work(&mut *scope)).await {
            Ok(Ok(value)) => {
                Self::commit(&mut *scope, deadline, self.config.max_duration, operation).await?;
                tracing::debug!(operation, attempt, "Transaction committed");
                Ok(value)
            }
            Ok(Err(err)) => {
                Self::rollback(&mut *scope, operation).await;
                tracing::debug!(operation, attempt, error = %err, "Transaction rolled back");
                Err(err)
            }
            Err(_) => {
                Self::rollback(&mut *scope, operation).await;
                Err(self.timed_out(operation, attempt))
            }
        }
    }

    /// Commit within the attempt's deadline.
    ///
    /// Only a commit the backend positively refused (serialization failure
    /// or deadlock) is retryable. Any other failure, including running out
    /// of time, leaves the outcome unknown: the transaction may have been
    /// applied, so rerunning it could apply it twice.
    async fn commit(
        scope: &mut dyn TransactionScope,
        deadline: Instant,
        max_duration: Duration,
        operation: &'static str,
    ) -> Result<(), TicketingError> {
        let err = match timeout_at(deadline, scope.commit()).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) => err,
            Err(_) => StoreError::TransactionTimeout(max_duration),
        };
        match err {
            StoreError::Contention(_) | StoreError::Deadlock(_) => {
                Err(TicketingError::Transient(err))
            }
            other => {
                tracing::error!(operation, error = %other, "Commit outcome unknown; not retrying");
                Err(TicketingError::Storage(other))
            }
        }
    }

    fn timed_out(&self, operation: &'static str, attempt: usize) -> TicketingError {
        tracing::warn!(
            operation,
            attempt,
            max_duration_ms = u64::try_from(self.config.max_duration.as_millis()).unwrap_or(u64::MAX),
            "Transaction exceeded its time budget"
        );
        TicketingError::Transient(StoreError::TransactionTimeout(self.config.max_duration))
    }

    async fn rollback(scope: &mut dyn TransactionScope, operation: &'static str) {
        if let Err(err) = scope.rollback().await {
            tracing::warn!(operation, error = %err, "Rollback failed; scope discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.retry.max_attempts(), 3);
        assert_eq!(config.max_duration, Duration::from_secs(10));
        assert_eq!(config.lock_timeout, Duration::from_secs(5));
    }
}
