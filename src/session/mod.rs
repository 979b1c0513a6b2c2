//! Session Controller
//!
//! Owns the [`SessionState`] and the [`PendingSelection`] of one session and
//! coordinates every operation that touches them:
//!
//! ```text
//!   UI event ──► begin_upload / begin_ask / begin_reset   (sync: checks, pending := X)
//!                      │
//!                      ▼
//!                OperationTask ──► RemoteService call       (async, cancellable)
//!                      │
//!                      ▼
//!                  Completion ──► finish()                  (sync: apply, pending := None)
//! ```
//!
//! `pending` is checked and set before the task exists and cleared when its
//! completion is applied, so at most one operation is ever in flight. The
//! controller enforces this itself; the UI disabling its triggers is only a
//! convenience on top.

pub mod conversation;
pub mod reset;
pub mod selection;
pub mod state;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use selection::{Advisory, PendingSelection};
pub use state::{Message, MessageKind, Pending, SessionState};

use crate::client::RemoteService;
use crate::models::{Answer, ResetAck, UploadSummary};
use crate::types::{AppError, AppResult};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 100;

// Tickets are unique across controllers so a completion from a discarded
// session can never match the in-flight operation of a new one.
static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// The network half of an operation. Resolves to a [`Completion`] that must
/// be handed back to [`SessionController::finish`].
pub type OperationTask = BoxFuture<'static, Completion>;

/// How the remote call of an operation ended
#[derive(Debug)]
pub enum Outcome {
    Uploaded(AppResult<UploadSummary>),
    Answered(AppResult<Answer>),
    Reset(AppResult<ResetAck>),
    Cancelled,
}

#[derive(Debug)]
pub struct Completion {
    ticket: u64,
    pub outcome: Outcome,
}

impl Completion {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

/// Change notifications for observers of the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    MessageAppended(Message),
    PendingChanged(Pending),
    DatasetLoaded(UploadSummary),
    /// Number of files now selected
    SelectionChanged(usize),
}

struct InFlight {
    ticket: u64,
    kind: Pending,
    cancel: CancellationToken,
}

pub struct SessionController {
    service: Arc<dyn RemoteService>,
    state: SessionState,
    selection: PendingSelection,
    in_flight: Option<InFlight>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(service: Arc<dyn RemoteService>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            service,
            state: SessionState::default(),
            selection: PendingSelection::default(),
            in_flight: None,
            events,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn selection(&self) -> &PendingSelection {
        &self.selection
    }

    /// The remote service this session talks to, for read-only calls
    /// (schema) that do not go through the pending gate.
    pub fn service(&self) -> Arc<dyn RemoteService> {
        Arc::clone(&self.service)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn in_flight_ticket(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|f| f.ticket)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.state.push(message.clone());
        self.emit(SessionEvent::MessageAppended(message));
    }

    fn set_pending(&mut self, pending: Pending) {
        if self.state.pending() != pending {
            self.state.set_pending(pending);
            self.emit(SessionEvent::PendingChanged(pending));
        }
    }

    pub(crate) fn ensure_idle(&self) -> AppResult<()> {
        match self.state.pending() {
            Pending::None => Ok(()),
            busy => {
                debug!("Rejecting submission: {} in progress", busy.label());
                Err(AppError::Busy(busy))
            }
        }
    }

    /// Mark `kind` as in flight and wrap `call` into a cancellable task.
    pub(crate) fn start<F>(&mut self, kind: Pending, call: F) -> OperationTask
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let ticket = NEXT_TICKET.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        self.in_flight = Some(InFlight {
            ticket,
            kind,
            cancel: cancel.clone(),
        });
        self.set_pending(kind);
        info!("Started {} (ticket {})", kind.label(), ticket);

        async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Outcome::Cancelled,
                outcome = call => outcome,
            };
            Completion { ticket, outcome }
        }
        .boxed()
    }

    /// Apply a completion. Returns false, leaving the session untouched, when
    /// the completion does not belong to the operation currently in flight.
    pub fn finish(&mut self, completion: Completion) -> bool {
        let kind = match &self.in_flight {
            Some(in_flight) if in_flight.ticket == completion.ticket => in_flight.kind,
            _ => {
                debug!("Ignoring stale completion (ticket {})", completion.ticket);
                return false;
            }
        };
        self.in_flight = None;

        match completion.outcome {
            Outcome::Uploaded(result) => self.apply_upload(result),
            Outcome::Answered(result) => self.apply_answer(result),
            Outcome::Reset(result) => self.apply_reset(result),
            Outcome::Cancelled => {
                info!("{} cancelled", kind.label());
                self.append(Message::system(cancelled_text(kind)));
            }
        }

        self.set_pending(Pending::None);
        true
    }

    /// Request cancellation of the in-flight operation. Its task resolves to
    /// `Outcome::Cancelled`, which still has to go through `finish`.
    pub fn cancel(&self) -> bool {
        match &self.in_flight {
            Some(in_flight) => {
                in_flight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Await a task started by this controller and apply its completion.
    pub async fn run(&mut self, task: OperationTask) -> bool {
        let completion = task.await;
        self.finish(completion)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!("Session dropped with {} in flight, cancelling", in_flight.kind.label());
            in_flight.cancel.cancel();
        }
    }
}

fn cancelled_text(kind: Pending) -> &'static str {
    match kind {
        Pending::Uploading => "Upload cancelled.",
        Pending::Asking => "Question cancelled.",
        Pending::Resetting => "Memory reset cancelled.",
        Pending::None => "Cancelled.",
    }
}
