//! One request/response cycle per submission.
//!
//! A [`ChatSession`] owns the conversation log, the transport and the
//! cancellation handle of the cycle currently running. Starting a new cycle
//! supersedes the previous one: its network call and its typed reveal are
//! both cancelled, and it ends silently with [`ChatError::Superseded`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::RelayTransport;
use crate::errors::{ChatError, ChatResult};
use crate::history::{Attachment, HistoryStore, Turn};
use crate::reveal::reveal;
use crate::types::{extract_reply_text, GenerateContentRequest};
use crate::view::ChatView;

/// Where the session is in its current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Sending,
    Revealing,
    Done,
    Errored,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineState::Idle => "idle",
            PipelineState::Sending => "thinking",
            PipelineState::Revealing => "typing",
            PipelineState::Done => "done",
            PipelineState::Errored => "error",
        };
        f.write_str(label)
    }
}

struct Cycle {
    id: u64,
    token: CancellationToken,
    superseded: Arc<AtomicBool>,
    finished: CancellationToken,
}

impl Cycle {
    fn supersede(&self) {
        self.superseded.store(true, Ordering::SeqCst);
        self.token.cancel();
    }
}

/// Handle a running cycle keeps to learn why it was cancelled
struct CycleTicket {
    id: u64,
    token: CancellationToken,
    superseded: Arc<AtomicBool>,
    /// Fired when this cycle is dropped, whatever the outcome.
    finished: CancellationToken,
    /// Latch of the cycle this one replaced.
    previous: Option<CancellationToken>,
}

impl Drop for CycleTicket {
    fn drop(&mut self) {
        self.finished.cancel();
    }
}

impl CycleTicket {
    /// Waits until the superseded cycle has fully stopped, so its network
    /// call is gone before this one dispatches.
    async fn wait_for_previous(&self) {
        if let Some(previous) = &self.previous {
            previous.cancelled().await;
        }
    }

    fn cancel_error(&self) -> ChatError {
        if self.superseded.load(Ordering::SeqCst) {
            ChatError::Superseded
        } else {
            ChatError::Aborted
        }
    }
}

struct Inner {
    state: PipelineState,
    active: Option<Cycle>,
}

/// Conversation state shared between the shell and running cycles
pub struct ChatSession {
    store: HistoryStore,
    transport: Arc<dyn RelayTransport>,
    reveal_interval: Duration,
    inner: Mutex<Inner>,
    next_cycle: AtomicU64,
}

impl ChatSession {
    pub fn new(
        store: HistoryStore,
        transport: Arc<dyn RelayTransport>,
        reveal_interval: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            reveal_interval,
            inner: Mutex::new(Inner {
                state: PipelineState::Idle,
                active: None,
            }),
            next_cycle: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state
    }

    /// The persisted conversation log.
    pub fn history(&self) -> Vec<Turn> {
        self.store.load()
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Empties the log. A cycle still running is superseded so its reply
    /// cannot land in the fresh log.
    pub fn clear(&self) -> ChatResult<()> {
        let mut inner = self.lock();
        if let Some(cycle) = inner.active.take() {
            cycle.supersede();
        }
        inner.state = PipelineState::Idle;
        // Appends take the same lock.
        self.store.clear()?;
        drop(inner);
        info!("Cleared conversation history");
        Ok(())
    }

    /// User-requested abort of the running cycle. Returns `false` when
    /// nothing was running.
    pub fn cancel(&self) -> bool {
        let inner = self.lock();
        match &inner.active {
            Some(cycle) => {
                debug!(cycle = cycle.id, "Cancelling active cycle");
                cycle.token.cancel();
                true
            }
            None => false,
        }
    }

    fn begin_cycle(&self) -> CycleTicket {
        let id = self.next_cycle.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();
        let superseded = Arc::new(AtomicBool::new(false));
        let finished = CancellationToken::new();

        let mut inner = self.lock();
        let previous = inner.active.take().map(|previous| {
            debug!(previous = previous.id, cycle = id, "Superseding previous cycle");
            previous.supersede();
            previous.finished
        });
        inner.active = Some(Cycle {
            id,
            token: token.clone(),
            superseded: superseded.clone(),
            finished: finished.clone(),
        });

        CycleTicket {
            id,
            token,
            superseded,
            finished,
            previous,
        }
    }

    fn end_cycle(&self, ticket: &CycleTicket) {
        let mut inner = self.lock();
        if inner.active.as_ref().is_some_and(|c| c.id == ticket.id) {
            inner.active = None;
        }
    }

    /// Persists `turn` only while `ticket` is still the active, uncancelled
    /// cycle. The check and the write share the lock with `clear`.
    fn append_if_active(&self, ticket: &CycleTicket, turn: Turn) -> ChatResult<usize> {
        let inner = self.lock();
        let still_active = inner.active.as_ref().is_some_and(|c| c.id == ticket.id);
        if !still_active || ticket.token.is_cancelled() {
            return Err(ticket.cancel_error());
        }
        self.store.append(turn)
    }

    /// Records a state change, unless the cycle has been superseded.
    fn transition(&self, ticket: &CycleTicket, state: PipelineState, view: &dyn ChatView) {
        {
            let mut inner = self.lock();
            if !inner.active.as_ref().is_some_and(|c| c.id == ticket.id) {
                return;
            }
            inner.state = state;
        }
        debug!(cycle = ticket.id, %state, "Pipeline transition");
        view.set_status(state);
    }

    /// Runs one full cycle for `text` and an optional attachment.
    ///
    /// The user turn is persisted before the network call starts. On success
    /// the model turn is persisted and returned. On failure no model turn is
    /// written and the error is shown in the view, except for supersession
    /// which stays silent.
    pub async fn submit(
        &self,
        text: &str,
        attachment: Option<Attachment>,
        view: &dyn ChatView,
    ) -> ChatResult<Turn> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Validation);
        }

        let ticket = self.begin_cycle();
        let result = self.run_cycle(&ticket, text, attachment, view).await;

        match &result {
            Ok(_) => {
                self.transition(&ticket, PipelineState::Done, view);
                self.transition(&ticket, PipelineState::Idle, view);
            }
            Err(e) if e.is_silent() => {
                debug!(cycle = ticket.id, "Cycle superseded");
            }
            Err(e) => {
                warn!(cycle = ticket.id, error = %e, "Cycle failed");
                view.show_error(&e.to_string());
                self.transition(&ticket, PipelineState::Errored, view);
            }
        }

        self.end_cycle(&ticket);
        result
    }

    async fn run_cycle(
        &self,
        ticket: &CycleTicket,
        text: &str,
        attachment: Option<Attachment>,
        view: &dyn ChatView,
    ) -> ChatResult<Turn> {
        ticket.wait_for_previous().await;
        if ticket.token.is_cancelled() {
            return Err(ticket.cancel_error());
        }

        let inline_data = attachment.as_ref().map(Attachment::to_inline_data);
        let logged = self.append_if_active(ticket, Turn::user(text.to_string(), attachment))?;
        debug!(cycle = ticket.id, turns = logged, "Persisted user turn");

        view.show_placeholder();
        self.transition(ticket, PipelineState::Sending, view);

        let payload = GenerateContentRequest::single_turn(text.to_string(), inline_data);
        let body = tokio::select! {
            _ = ticket.token.cancelled() => return Err(ticket.cancel_error()),
            result = self.transport.send(&payload) => result?,
        };
        let reply = extract_reply_text(&body);

        self.transition(ticket, PipelineState::Revealing, view);
        if !reveal(&reply, self.reveal_interval, &ticket.token, view).await {
            return Err(ticket.cancel_error());
        }

        let turn = Turn::model(reply);
        self.append_if_active(ticket, turn.clone())?;

        view.finish(&turn.text);
        info!(cycle = ticket.id, chars = turn.text.len(), "Reply complete");
        Ok(turn)
    }
}

/// Single in-flight flag guarding a shell against overlapping submissions.
///
/// Submissions that arrive while a permit is held are dropped, not queued.
#[derive(Debug, Default, Clone)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Takes the flag, or `None` if a submission is already in flight.
    pub fn try_acquire(&self) -> Option<InFlightPermit> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightPermit(self.0.clone()))
    }
}

/// Clears the in-flight flag when dropped.
#[derive(Debug)]
pub struct InFlightPermit(Arc<AtomicBool>);

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
