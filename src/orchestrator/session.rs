//! Check session state: ledger, busy flag and error banner.

use crate::engine::{BackendReply, EvaluationBackend, TransportFailure};
use crate::error::CheckError;
use crate::export;
use crate::ledger::HistoryLedger;
use crate::model::{CheckEvent, CheckRequest, ResultRecord, Status};
use crate::orchestrator::post_process::interpret_outcome;
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc::UnboundedSender;

/// Shared idle/busy flag.
#[derive(Debug, Clone, Default)]
pub struct StatusFlag {
    busy: Arc<AtomicBool>,
}

impl StatusFlag {
    pub fn status(&self) -> Status {
        if self.busy.load(Ordering::Acquire) {
            Status::Busy
        } else {
            Status::Idle
        }
    }

    fn try_acquire(&self, events: Option<UnboundedSender<CheckEvent>>) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        if let Some(tx) = events.as_ref() {
            let _ = tx.send(CheckEvent::StatusChanged(Status::Busy));
        }
        Some(BusyGuard {
            busy: self.busy.clone(),
            events,
        })
    }
}

/// Holds the flag busy; dropping it returns the flag to idle on every exit path.
#[derive(Debug)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
    events: Option<UnboundedSender<CheckEvent>>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
        if let Some(tx) = self.events.as_ref() {
            let _ = tx.send(CheckEvent::StatusChanged(Status::Idle));
        }
    }
}

/// A validated check whose network call has not settled yet.
#[derive(Debug)]
pub struct PendingCheck {
    request: CheckRequest,
    _guard: BusyGuard,
}

impl PendingCheck {
    pub fn request(&self) -> &CheckRequest {
        &self.request
    }
}

/// State container driving checks from submission to ledger update.
pub struct CheckOrchestrator {
    backend: Arc<dyn EvaluationBackend>,
    ledger: HistoryLedger,
    status: StatusFlag,
    last_error: Option<String>,
    events: Option<UnboundedSender<CheckEvent>>,
}

impl CheckOrchestrator {
    pub fn new(backend: Arc<dyn EvaluationBackend>) -> Self {
        Self {
            backend,
            ledger: HistoryLedger::new(),
            status: StatusFlag::default(),
            last_error: None,
            events: None,
        }
    }

    /// Subscribe a presentation layer to change notifications.
    pub fn with_events(mut self, events: UnboundedSender<CheckEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn backend(&self) -> Arc<dyn EvaluationBackend> {
        self.backend.clone()
    }

    pub fn status(&self) -> Status {
        self.status.status()
    }

    /// Top-level banner: the most recent failure, if the latest attempt failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub(crate) fn notify(&self, ev: CheckEvent) {
        if let Some(tx) = self.events.as_ref() {
            let _ = tx.send(ev);
        }
    }

    fn set_error(&mut self, error: Option<String>) {
        if self.last_error != error {
            self.last_error = error.clone();
            self.notify(CheckEvent::ErrorChanged(error));
        }
    }

    /// Validate input and mark the session busy.
    ///
    /// Empty input sets the banner and returns `InvalidInput` without touching
    /// the flag or the ledger.
    pub fn begin(&mut self, prompt: &str, brand: &str) -> Result<PendingCheck, CheckError> {
        if prompt.trim().is_empty() || brand.trim().is_empty() {
            self.set_error(Some(CheckError::InvalidInput.to_string()));
            return Err(CheckError::InvalidInput);
        }
        let guard = self
            .status
            .try_acquire(self.events.clone())
            .ok_or(CheckError::Busy)?;
        self.set_error(None);
        tracing::info!(brand = %brand, "check started");
        Ok(PendingCheck {
            request: CheckRequest {
                prompt: prompt.to_string(),
                brand: brand.to_string(),
            },
            _guard: guard,
        })
    }

    /// Record the outcome of a pending check and release the busy flag.
    ///
    /// A record is appended for every outcome; `Err` means that record carries
    /// the returned error text.
    pub fn complete(
        &mut self,
        pending: PendingCheck,
        outcome: Result<BackendReply, TransportFailure>,
    ) -> Result<ResultRecord, CheckError> {
        let (record, failure) = interpret_outcome(&pending.request, outcome);
        self.ledger.append(record.clone());
        self.notify(CheckEvent::RecordAppended(record.clone()));
        self.set_error(record.error().map(str::to_string));
        drop(pending);

        match failure {
            Some(e) => {
                tracing::warn!(kind = ?e.kind(), error = %e, "check failed");
                Err(e)
            }
            None => {
                tracing::info!(mentioned = record.mentioned(), "check completed");
                Ok(record)
            }
        }
    }

    /// Run one check end to end.
    pub async fn submit_check(
        &mut self,
        prompt: &str,
        brand: &str,
    ) -> Result<ResultRecord, CheckError> {
        let pending = self.begin(prompt, brand)?;
        let outcome = self.backend.evaluate(pending.request()).await;
        self.complete(pending, outcome)
    }

    /// Drop every record. Does not affect a check already in flight.
    pub fn clear_history(&mut self) {
        self.ledger.clear();
        tracing::info!("history cleared");
        self.notify(CheckEvent::HistoryCleared);
    }

    pub fn to_csv(&self) -> String {
        export::to_csv(self.ledger.iter())
    }

    pub fn export_csv(&self, path: &Path) -> anyhow::Result<()> {
        export::write_csv(path, self.ledger.iter())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{ErrorKind, CONNECTION_FAILURE_MESSAGE, INVALID_INPUT_MESSAGE};
    use crate::model::Position;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    /// Backend returning a canned outcome and counting calls.
    pub(crate) struct FakeBackend {
        pub calls: AtomicUsize,
        outcome: Result<BackendReply, TransportFailure>,
    }

    impl FakeBackend {
        pub(crate) fn replying(status: u16, body: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome: Ok(BackendReply {
                    status,
                    body: Some(body),
                }),
            })
        }

        pub(crate) fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome: Err(TransportFailure::unreachable()),
            })
        }
    }

    #[async_trait]
    impl EvaluationBackend for FakeBackend {
        async fn evaluate(&self, _request: &CheckRequest) -> Result<BackendReply, TransportFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_locally() {
        let backend = FakeBackend::replying(200, json!({"mentioned": true}));
        let mut orch = CheckOrchestrator::new(backend.clone());

        for (prompt, brand) in [("", "Nike"), ("prompt", ""), ("   ", "Nike"), ("p", "\t\n"), ("", "")] {
            let err = orch.submit_check(prompt, brand).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
            assert_eq!(orch.last_error(), Some(INVALID_INPUT_MESSAGE));
            assert_eq!(orch.status(), Status::Idle);
        }
        assert!(orch.history().is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_check_lands_at_index_zero() {
        let backend = FakeBackend::replying(200, json!({"mentioned": true, "position": 3}));
        let mut orch = CheckOrchestrator::new(backend.clone());
        orch.submit_check("older", "Nike").await.unwrap();

        let record = orch.submit_check("Best running shoes?", "Nike").await.unwrap();

        let expected = ResultRecord::new("Best running shoes?", true, Some(Position::Rank(3)), None);
        assert_eq!(record, expected);
        assert_eq!(orch.history().latest(), Some(&expected));
        assert_eq!(orch.history().len(), 2);
        assert_eq!(orch.last_error(), None);
        assert_eq!(orch.status(), Status::Idle);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn backend_error_is_recorded_and_surfaced() {
        let backend = FakeBackend::replying(500, json!({"error": "rate limited"}));
        let mut orch = CheckOrchestrator::new(backend);

        let err = orch.submit_check("Best running shoes?", "Nike").await.unwrap_err();

        assert_eq!(err, CheckError::BackendError("rate limited".into()));
        assert_eq!(
            orch.history().latest(),
            Some(&ResultRecord::new(
                "Best running shoes?",
                false,
                None,
                Some("rate limited".into())
            ))
        );
        assert_eq!(orch.last_error(), Some("rate limited"));
        assert_eq!(orch.status(), Status::Idle);
    }

    #[tokio::test]
    async fn unreachable_backend_is_recorded_with_default_message() {
        let mut orch = CheckOrchestrator::new(FakeBackend::unreachable());

        let err = orch.submit_check("p", "b").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
        let latest = orch.history().latest().unwrap();
        assert_eq!(latest.error(), Some(CONNECTION_FAILURE_MESSAGE));
        assert!(!latest.mentioned());
        assert_eq!(latest.position(), None);
        assert_eq!(orch.last_error(), Some(CONNECTION_FAILURE_MESSAGE));
    }

    #[tokio::test]
    async fn banner_is_cleared_when_next_attempt_starts() {
        let mut orch = CheckOrchestrator::new(FakeBackend::unreachable());
        let _ = orch.submit_check("p", "b").await;
        assert!(orch.last_error().is_some());

        let pending = orch.begin("p", "b").unwrap();
        assert_eq!(orch.last_error(), None);
        assert_eq!(orch.status(), Status::Busy);
        drop(pending);
    }

    #[tokio::test]
    async fn second_begin_while_busy_is_refused() {
        let mut orch = CheckOrchestrator::new(FakeBackend::unreachable());
        let pending = orch.begin("p", "b").unwrap();

        assert_eq!(orch.begin("p2", "b").unwrap_err(), CheckError::Busy);
        assert!(orch.history().is_empty());
        assert_eq!(orch.status(), Status::Busy);

        drop(pending);
        assert_eq!(orch.status(), Status::Idle);
        assert!(orch.begin("p2", "b").is_ok());
    }

    #[tokio::test]
    async fn request_keeps_original_strings() {
        let mut orch = CheckOrchestrator::new(FakeBackend::unreachable());
        let pending = orch.begin("  padded prompt ", " Nike").unwrap();
        assert_eq!(pending.request().prompt, "  padded prompt ");
        assert_eq!(pending.request().brand, " Nike");
    }

    #[tokio::test]
    async fn events_follow_the_check_lifecycle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = FakeBackend::replying(500, json!({"error": "rate limited"}));
        let mut orch = CheckOrchestrator::new(backend).with_events(tx);

        let _ = orch.submit_check("p", "b").await;
        orch.clear_history();

        let mut seen = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            seen.push(match ev {
                CheckEvent::StatusChanged(s) => format!("status:{s:?}"),
                CheckEvent::ErrorChanged(e) => format!("error:{}", e.unwrap_or_default()),
                CheckEvent::RecordAppended(r) => format!("record:{}", r.prompt()),
                CheckEvent::HistoryCleared => "cleared".to_string(),
                CheckEvent::Info(i) => format!("info:{}", i.to_message()),
            });
        }
        assert_eq!(
            seen,
            [
                "status:Busy",
                "record:p",
                "error:rate limited",
                "status:Idle",
                "cleared"
            ]
        );
        assert!(orch.history().is_empty());
    }

    #[tokio::test]
    async fn csv_reflects_history_order() {
        let backend = FakeBackend::replying(200, json!({"mentioned": true, "position": 1}));
        let mut orch = CheckOrchestrator::new(backend);
        orch.submit_check("first", "b").await.unwrap();
        orch.submit_check("second", "b").await.unwrap();

        assert_eq!(
            orch.to_csv(),
            "prompt,mentioned,position\n\"second\",\"true\",\"1\"\n\"first\",\"true\",\"1\""
        );

        orch.clear_history();
        assert_eq!(orch.to_csv(), "prompt,mentioned,position");
    }
}
