//! Subscription and cancellation
//!
//! Every polling operation owns one [`Gate`] holding the observer and the
//! current phase. Both the polling task and [`Subscription::cancel`] go
//! through it, which is what makes "no callback after cancel returns" and
//! "exactly one terminal callback" hold. Callbacks run with the observer
//! locked; a cancel issued from inside one is recorded on the phase and
//! settled when the callback returns.

use kiln_core::domain::job::JobId;
use kiln_core::domain::status::StatusSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::error::PollError;
use crate::observer::PollObserver;

/// Lifecycle phase of a polling operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollPhase {
    /// Waiting for or performing a status query
    Polling,
    /// A snapshot is being delivered to the observer
    Emitting,
    Succeeded,
    Failed,
    Cancelled,
}

impl PollPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollPhase::Succeeded | PollPhase::Failed | PollPhase::Cancelled
        )
    }
}

/// Final result of a polling operation
#[derive(Debug)]
pub enum PollResult {
    Succeeded(StatusSnapshot),
    Failed(PollError),
    Cancelled,
}

impl PollResult {
    pub fn phase(&self) -> PollPhase {
        match self {
            PollResult::Succeeded(_) => PollPhase::Succeeded,
            PollResult::Failed(_) => PollPhase::Failed,
            PollResult::Cancelled => PollPhase::Cancelled,
        }
    }
}

struct GateState {
    observer: Option<Box<dyn PollObserver>>,
    result: Option<PollResult>,
}

/// Serializes every delivery to the observer of one operation
///
/// `state` is held for the whole delivery, `phase` only briefly, so the
/// phase stays readable and cancellable from inside a callback.
pub(crate) struct Gate {
    state: Mutex<GateState>,
    phase: Mutex<PollPhase>,
    /// Thread currently running an observer callback
    delivering: Mutex<Option<ThreadId>>,
    cancelled_in_callback: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the current thread as delivering until dropped
struct Delivery<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

impl Gate {
    pub(crate) fn new(observer: Box<dyn PollObserver>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(GateState {
                observer: Some(observer),
                result: None,
            }),
            phase: Mutex::new(PollPhase::Polling),
            delivering: Mutex::new(None),
            cancelled_in_callback: AtomicBool::new(false),
        })
    }

    pub(crate) fn phase(&self) -> PollPhase {
        *lock(&self.phase)
    }

    /// Moves to `next` unless the operation already ended
    fn enter(&self, next: PollPhase) -> bool {
        let mut phase = lock(&self.phase);
        if phase.is_terminal() {
            return false;
        }
        *phase = next;
        true
    }

    fn delivery(&self) -> Delivery<'_> {
        *lock(&self.delivering) = Some(thread::current().id());
        Delivery(&self.delivering)
    }

    /// Whether the calling thread is inside an observer callback of this gate
    pub(crate) fn is_delivering_here(&self) -> bool {
        *lock(&self.delivering) == Some(thread::current().id())
    }

    /// Cancels from inside a callback without waiting for the delivery lock
    ///
    /// `on_cancelled` fires once the running callback returns.
    pub(crate) fn cancel_from_callback(&self) -> bool {
        let mut phase = lock(&self.phase);
        if phase.is_terminal() {
            return false;
        }
        *phase = PollPhase::Cancelled;
        self.cancelled_in_callback.store(true, Ordering::SeqCst);
        true
    }

    /// Delivers a non-terminal snapshot
    ///
    /// Returns false when the operation ended before or during delivery.
    pub(crate) fn emit(&self, snapshot: &StatusSnapshot) -> bool {
        let mut state = lock(&self.state);
        if !self.enter(PollPhase::Emitting) {
            return false;
        }

        if let Some(observer) = state.observer.as_mut() {
            let _delivery = self.delivery();
            observer.on_snapshot(snapshot);
        }
        if self.cancelled_in_callback.load(Ordering::SeqCst) {
            self.settle(&mut state, PollResult::Cancelled);
            return false;
        }

        *lock(&self.phase) = PollPhase::Polling;
        true
    }

    /// Delivers the terminal snapshot and completes the operation in one step
    ///
    /// A cancel issued from the snapshot callback wins over completion.
    pub(crate) fn complete(&self, snapshot: StatusSnapshot) -> bool {
        let mut state = lock(&self.state);
        if !self.enter(PollPhase::Emitting) {
            return false;
        }

        if let Some(observer) = state.observer.as_mut() {
            let _delivery = self.delivery();
            observer.on_snapshot(&snapshot);
        }
        if self.cancelled_in_callback.load(Ordering::SeqCst) {
            self.settle(&mut state, PollResult::Cancelled);
            return false;
        }

        self.settle(&mut state, PollResult::Succeeded(snapshot));
        true
    }

    /// Ends the operation with a failure or cancellation
    ///
    /// Returns false if the operation had already ended; the first terminal
    /// outcome always wins.
    pub(crate) fn finish(&self, result: PollResult) -> bool {
        let mut state = lock(&self.state);
        if self.phase().is_terminal() {
            return false;
        }

        self.settle(&mut state, result);
        true
    }

    fn settle(&self, state: &mut GateState, result: PollResult) {
        *lock(&self.phase) = result.phase();
        if let Some(mut observer) = state.observer.take() {
            let _delivery = self.delivery();
            match &result {
                PollResult::Succeeded(snapshot) => observer.on_complete(snapshot),
                PollResult::Failed(error) => observer.on_error(error),
                PollResult::Cancelled => observer.on_cancelled(),
            }
        }
        state.result = Some(result);
    }

    fn take_result(&self) -> Option<PollResult> {
        lock(&self.state).result.take()
    }
}

/// Handle held by the caller of one polling operation
///
/// Dropping the subscription detaches from the operation without stopping
/// it; call [`cancel`](Self::cancel) to stop polling.
pub struct Subscription {
    id: Uuid,
    job_id: JobId,
    token: CancellationToken,
    gate: Arc<Gate>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(
        id: Uuid,
        job_id: JobId,
        token: CancellationToken,
        gate: Arc<Gate>,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            job_id,
            token,
            gate,
            handle: Some(handle),
        }
    }

    /// Identifier of this polling operation, as it appears in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn phase(&self) -> PollPhase {
        self.gate.phase()
    }

    pub fn is_finished(&self) -> bool {
        self.phase().is_terminal()
    }

    /// Token observed by the polling task
    ///
    /// Cancelling it is cooperative: the task notices before its next
    /// delivery or sleep and then fires `on_cancelled`. Useful to stop
    /// polling from code that does not own the subscription.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stops the operation
    ///
    /// Idempotent and safe after termination, including from inside an
    /// observer callback. Once this returns no further snapshot fires;
    /// `on_cancelled` fires here if the operation was still running, or right
    /// after the current callback when called from one. An in-flight query is
    /// allowed to finish but its result is dropped.
    pub fn cancel(&self) {
        self.token.cancel();

        if self.gate.is_delivering_here() {
            if self.gate.cancel_from_callback() {
                info!(
                    "Polling of job {} cancelled from a callback (operation {})",
                    self.job_id, self.id
                );
            }
            return;
        }

        if self.gate.finish(PollResult::Cancelled) {
            info!("Polling of job {} cancelled (operation {})", self.job_id, self.id);
        }
    }

    /// Waits for the operation to end and returns its result
    pub async fn wait(mut self) -> PollResult {
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            self.gate
                .finish(PollResult::Failed(PollError::Aborted(e.to_string())));
        }

        self.gate.take_result().unwrap_or(PollResult::Cancelled)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("job_id", &self.job_id)
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Callbacks;

    fn recording_gate() -> (Arc<Gate>, Arc<Mutex<Vec<String>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c, d) = (
            Arc::clone(&events),
            Arc::clone(&events),
            Arc::clone(&events),
            Arc::clone(&events),
        );
        let callbacks = Callbacks::new()
            .on_snapshot(move |s| a.lock().unwrap().push(format!("snapshot {}", s.application_status)))
            .on_complete(move |_| b.lock().unwrap().push("complete".into()))
            .on_error(move |_| c.lock().unwrap().push("error".into()))
            .on_cancelled(move || d.lock().unwrap().push("cancelled".into()));
        (Gate::new(Box::new(callbacks)), events)
    }

    #[test]
    fn first_terminal_outcome_wins() {
        let (gate, events) = recording_gate();

        assert!(gate.finish(PollResult::Cancelled));
        assert!(!gate.finish(PollResult::Failed(PollError::Aborted("late".into()))));
        assert!(!gate.emit(&StatusSnapshot::new(200, None, None)));

        assert_eq!(gate.phase(), PollPhase::Cancelled);
        assert_eq!(*events.lock().unwrap(), vec!["cancelled"]);
        assert!(matches!(gate.take_result(), Some(PollResult::Cancelled)));
    }

    #[test]
    fn complete_delivers_snapshot_then_completion() {
        let (gate, events) = recording_gate();

        assert!(gate.emit(&StatusSnapshot::new(200, None, None)));
        assert_eq!(gate.phase(), PollPhase::Polling);
        assert!(gate.complete(StatusSnapshot::new(200, None, None)));

        assert_eq!(gate.phase(), PollPhase::Succeeded);
        assert_eq!(
            *events.lock().unwrap(),
            vec!["snapshot 0", "snapshot 0", "complete"]
        );
    }

    #[test]
    fn terminal_phases() {
        assert!(!PollPhase::Polling.is_terminal());
        assert!(!PollPhase::Emitting.is_terminal());
        assert!(PollPhase::Succeeded.is_terminal());
        assert!(PollPhase::Failed.is_terminal());
        assert!(PollPhase::Cancelled.is_terminal());
    }
}
