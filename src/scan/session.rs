use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use super::{
    controller::{ScanController, ScanOutcome, ScanState},
    draft::DraftEdit,
    ScanEvent,
};
use crate::{errors::ScanError, models::Product};

const COMMAND_BUFFER: usize = 16;

/// The session task is gone; any in-flight result was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Scan session is closed")]
pub struct SessionClosed;

enum Command {
    Activate(oneshot::Sender<()>),
    Scan(ScanEvent, oneshot::Sender<ScanOutcome>),
    Retry(oneshot::Sender<Option<ScanOutcome>>),
    Dismiss(oneshot::Sender<()>),
    EditDraft(DraftEdit, oneshot::Sender<bool>),
    Submit(oneshot::Sender<Option<Result<Product, ScanError>>>),
}

/// A [`ScanController`] running on its own task.
///
/// Commands are processed one at a time. Tearing the session down while a
/// lookup or a create is in flight drops the request: its result never
/// reaches the controller and the caller waiting on it gets [`SessionClosed`].
pub struct ScanSession {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ScanState>,
    shutdown: watch::Sender<bool>,
}

impl ScanSession {
    pub fn spawn(mut controller: ScanController) -> Self {
        let state = controller.subscribe();
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown, shutdown_rx) = watch::channel(false);

        tokio::spawn(run(controller, command_rx, shutdown_rx));

        Self {
            commands,
            state,
            shutdown,
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionClosed> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SessionClosed)?;
        rx.await.map_err(|_| SessionClosed)
    }

    pub async fn activate(&self) -> Result<(), SessionClosed> {
        self.request(Command::Activate).await
    }

    /// Feeds a scan stamped with the current time.
    pub async fn scan(&self, raw: impl Into<String>) -> Result<ScanOutcome, SessionClosed> {
        self.scan_event(ScanEvent::now(raw)).await
    }

    pub async fn scan_event(&self, event: ScanEvent) -> Result<ScanOutcome, SessionClosed> {
        self.request(|reply| Command::Scan(event, reply)).await
    }

    pub async fn retry(&self) -> Result<Option<ScanOutcome>, SessionClosed> {
        self.request(Command::Retry).await
    }

    pub async fn dismiss(&self) -> Result<(), SessionClosed> {
        self.request(Command::Dismiss).await
    }

    pub async fn edit_draft(&self, edit: DraftEdit) -> Result<bool, SessionClosed> {
        self.request(|reply| Command::EditDraft(edit, reply)).await
    }

    pub async fn submit(&self) -> Result<Option<Result<Product, ScanError>>, SessionClosed> {
        self.request(Command::Submit).await
    }

    /// Latest published state.
    pub fn state(&self) -> ScanState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.clone()
    }

    /// Stops the session and waits for the task to finish. Returns the final
    /// state, which is always `Idle`.
    pub async fn teardown(&self) -> ScanState {
        let _ = self.shutdown.send(true);

        let mut state = self.state.clone();
        while state.changed().await.is_ok() {}
        let last = state.borrow().clone();
        last
    }
}

async fn run(
    mut controller: ScanController,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("scan session started");
    loop {
        let command = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            Command::Activate(reply) => {
                controller.activate();
                let _ = reply.send(());
            }
            Command::Scan(event, reply) => {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        info!("session torn down during a scan; result discarded");
                        break;
                    }
                    outcome = controller.handle_scan(event) => {
                        let _ = reply.send(outcome);
                    }
                }
            }
            Command::Retry(reply) => {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        info!("session torn down during a retry; result discarded");
                        break;
                    }
                    outcome = controller.retry() => {
                        let _ = reply.send(outcome);
                    }
                }
            }
            Command::Dismiss(reply) => {
                controller.dismiss();
                let _ = reply.send(());
            }
            Command::EditDraft(edit, reply) => {
                let _ = reply.send(controller.edit_draft(edit));
            }
            Command::Submit(reply) => {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        info!("session torn down during a submit; result discarded");
                        break;
                    }
                    created = controller.submit_draft() => {
                        let _ = reply.send(created);
                    }
                }
            }
        }
    }

    controller.teardown();
    debug!("scan session stopped");
}
