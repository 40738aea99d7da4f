//! Multi-step writes with compensating deletes.
//!
//! Each successful step registers an undo action. When a later step fails
//! the registered actions run in reverse order; a failing undo is logged and
//! counted but never replaces the error that triggered the rollback.

use futures::future::BoxFuture;
use std::future::Future;

use crate::api::metrics;
use crate::utils::AppError;

type Compensation = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), AppError>> + Send>;

pub struct Saga {
    name: &'static str,
    compensations: Vec<(&'static str, Compensation)>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            compensations: Vec::new(),
        }
    }

    /// Registers the undo action for the step that just succeeded.
    pub fn on_rollback<F, Fut>(&mut self, label: &'static str, undo: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        self.compensations
            .push((label, Box::new(move || Box::pin(undo()))));
    }

    pub fn pending(&self) -> usize {
        self.compensations.len()
    }

    /// Runs every registered compensation, newest first, and hands back `error`.
    pub async fn abort(self, error: AppError) -> AppError {
        log::warn!(
            "↩️  Saga '{}' failed ({}), running {} compensation(s)",
            self.name,
            error,
            self.compensations.len()
        );

        for (label, undo) in self.compensations.into_iter().rev() {
            metrics::increment_compensation_count();
            match undo().await {
                Ok(()) => log::info!("   ✅ Compensated: {}", label),
                Err(e) => {
                    metrics::increment_compensation_failure_count();
                    log::error!("   ❌ Compensation '{}' of saga '{}' failed: {}", label, self.name, e);
                }
            }
        }

        error
    }

    /// Fails without compensating; earlier writes stay in place.
    pub fn abandon(self, error: AppError) -> AppError {
        log::error!(
            "⚠️  Saga '{}' failed ({}) after a step with no compensation; {} earlier write(s) left in place",
            self.name,
            error,
            self.compensations.len()
        );
        error
    }

    pub fn commit(self) {
        log::debug!("✅ Saga '{}' committed ({} step(s))", self.name, self.compensations.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_compensations_run_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new("test");

        for step in ["first", "second", "third"] {
            let log = log.clone();
            saga.on_rollback(step, move || async move {
                log.lock().unwrap().push(step);
                Ok(())
            });
        }
        assert_eq!(saga.pending(), 3);

        let err = saga.abort(AppError::Persistence("boom".into())).await;
        assert_eq!(err, AppError::Persistence("boom".into()));
        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_failing_compensation_keeps_original_error() {
        let ran = Arc::new(Mutex::new(false));
        let mut saga = Saga::new("test");

        let flag = ran.clone();
        saga.on_rollback("older", move || async move {
            *flag.lock().unwrap() = true;
            Ok(())
        });
        saga.on_rollback("newer", || async { Err(AppError::Persistence("undo failed".into())) });

        let err = saga.abort(AppError::Persistence("bank info".into())).await;
        assert_eq!(err, AppError::Persistence("bank info".into()));
        // the older compensation still ran
        assert!(*ran.lock().unwrap());
    }
}
