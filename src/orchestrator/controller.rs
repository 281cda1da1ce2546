//! Check lifecycle controller.
//!
//! Owns the orchestrator on behalf of interactive front ends. Network calls run
//! in their own task so commands (clear, export, quit) are still handled while a
//! check is in flight.

use crate::engine::{BackendReply, TransportFailure};
use crate::error::CheckError;
use crate::model::{CheckEvent, InfoEvent};
use crate::orchestrator::session::{CheckOrchestrator, PendingCheck};
use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub enum UiCommand {
    Submit { prompt: String, brand: String },
    ClearHistory,
    ExportCsv(PathBuf),
    Quit,
}

/// Internal handle for a check whose request is still running.
struct InFlight {
    pending: PendingCheck,
    handle: Option<JoinHandle<Result<BackendReply, TransportFailure>>>,
}

fn start_check(orchestrator: &CheckOrchestrator, pending: PendingCheck) -> InFlight {
    let backend = orchestrator.backend();
    let request = pending.request().clone();
    let handle = tokio::spawn(async move { backend.evaluate(&request).await });
    InFlight {
        pending,
        handle: Some(handle),
    }
}

fn export(orchestrator: &CheckOrchestrator, path: PathBuf) -> InfoEvent {
    let rows = orchestrator.history().len();
    if rows == 0 {
        return InfoEvent::Message("Nothing to export yet.".into());
    }
    match orchestrator.export_csv(&path) {
        Ok(()) => InfoEvent::Exported { path, rows },
        Err(e) => InfoEvent::ExportFailed(format!("{e:#}")),
    }
}

/// Serve UI commands until `Quit` (or the command channel closes).
///
/// A quit request waits for the in-flight check, if any, so its record is
/// still appended before returning.
pub async fn run_controller(
    orchestrator: &mut CheckOrchestrator,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut in_flight: Option<InFlight> = None;
    let mut quit_pending = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if !quit_pending => {
                match cmd {
                    Some(UiCommand::Submit { prompt, brand }) => {
                        match orchestrator.begin(&prompt, &brand) {
                            Ok(pending) => in_flight = Some(start_check(orchestrator, pending)),
                            Err(CheckError::Busy) => {
                                orchestrator.notify(CheckEvent::Info(InfoEvent::Message(
                                    CheckError::Busy.to_string(),
                                )));
                            }
                            // The banner already carries validation failures.
                            Err(_) => {}
                        }
                    }
                    Some(UiCommand::ClearHistory) => orchestrator.clear_history(),
                    Some(UiCommand::ExportCsv(path)) => {
                        let info = export(orchestrator, path);
                        orchestrator.notify(CheckEvent::Info(info));
                    }
                    Some(UiCommand::Quit) | None => {
                        if in_flight.is_none() {
                            break Ok(());
                        }
                        quit_pending = true;
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            joined = async {
                if let Some(flight) = &mut in_flight {
                    if let Some(h) = flight.handle.as_mut() {
                        return h.await;
                    }
                }
                futures::future::pending().await
            } => {
                let Some(flight) = in_flight.take() else {
                    continue;
                };
                let outcome = joined.unwrap_or_else(|e| {
                    Err(TransportFailure::with_message(format!("check task failed: {e}")))
                });
                let _ = orchestrator.complete(flight.pending, outcome);
                if quit_pending {
                    break Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EvaluationBackend;
    use crate::model::{CheckRequest, Status};
    use crate::orchestrator::session::tests::FakeBackend;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Notify};

    /// Backend that holds every request until released.
    struct GatedBackend {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl EvaluationBackend for GatedBackend {
        async fn evaluate(&self, _request: &CheckRequest) -> Result<BackendReply, TransportFailure> {
            self.gate.notified().await;
            Ok(BackendReply {
                status: 200,
                body: Some(json!({"mentioned": true, "position": 2})),
            })
        }
    }

    async fn wait_for(
        rx: &mut mpsc::UnboundedReceiver<CheckEvent>,
        pred: impl Fn(&CheckEvent) -> bool,
    ) -> CheckEvent {
        loop {
            let ev = rx.recv().await.expect("event channel closed");
            if pred(&ev) {
                return ev;
            }
        }
    }

    #[tokio::test]
    async fn clear_during_flight_still_appends() {
        let gate = Arc::new(Notify::new());
        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let mut orch = CheckOrchestrator::new(Arc::new(GatedBackend { gate: gate.clone() }))
            .with_events(evt_tx);

        let driver = async {
            cmd_tx
                .send(UiCommand::Submit {
                    prompt: "p".into(),
                    brand: "b".into(),
                })
                .unwrap();
            wait_for(&mut evt_rx, |e| {
                matches!(e, CheckEvent::StatusChanged(Status::Busy))
            })
            .await;

            cmd_tx
                .send(UiCommand::Submit {
                    prompt: "again".into(),
                    brand: "b".into(),
                })
                .unwrap();
            wait_for(&mut evt_rx, |e| matches!(e, CheckEvent::Info(_))).await;

            cmd_tx.send(UiCommand::ClearHistory).unwrap();
            wait_for(&mut evt_rx, |e| matches!(e, CheckEvent::HistoryCleared)).await;

            gate.notify_one();
            let appended =
                wait_for(&mut evt_rx, |e| matches!(e, CheckEvent::RecordAppended(_))).await;
            cmd_tx.send(UiCommand::Quit).unwrap();
            appended
        };

        let (res, appended) = tokio::join!(run_controller(&mut orch, cmd_rx), driver);
        res.unwrap();

        match appended {
            CheckEvent::RecordAppended(r) => assert_eq!(r.prompt(), "p"),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(orch.history().len(), 1);
        assert_eq!(orch.status(), Status::Idle);
    }

    #[tokio::test]
    async fn quit_waits_for_in_flight_check() {
        let gate = Arc::new(Notify::new());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let mut orch = CheckOrchestrator::new(Arc::new(GatedBackend { gate: gate.clone() }));

        cmd_tx
            .send(UiCommand::Submit {
                prompt: "p".into(),
                brand: "b".into(),
            })
            .unwrap();
        cmd_tx.send(UiCommand::Quit).unwrap();
        gate.notify_one();

        run_controller(&mut orch, cmd_rx).await.unwrap();
        assert_eq!(orch.history().len(), 1);
    }

    #[tokio::test]
    async fn export_reports_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let mut orch =
            CheckOrchestrator::new(FakeBackend::replying(200, json!({"mentioned": false})))
                .with_events(evt_tx);

        cmd_tx.send(UiCommand::ExportCsv(path.clone())).unwrap();
        cmd_tx.send(UiCommand::Quit).unwrap();
        run_controller(&mut orch, cmd_rx).await.unwrap();

        let info = wait_for(&mut evt_rx, |e| matches!(e, CheckEvent::Info(_))).await;
        match info {
            CheckEvent::Info(InfoEvent::Message(m)) => assert_eq!(m, "Nothing to export yet."),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(!path.exists());

        orch.submit_check("p", "b").await.unwrap();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        cmd_tx.send(UiCommand::ExportCsv(path.clone())).unwrap();
        cmd_tx.send(UiCommand::Quit).unwrap();
        run_controller(&mut orch, cmd_rx).await.unwrap();

        let info = wait_for(&mut evt_rx, |e| matches!(e, CheckEvent::Info(_))).await;
        assert!(matches!(info, CheckEvent::Info(InfoEvent::Exported { rows: 1, .. })));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "prompt,mentioned,position\n\"p\",\"false\",\"\""
        );
    }
}
