//! Consumer-facing callbacks
//!
//! A [`PollObserver`] receives every snapshot of one polling operation and
//! exactly one terminal notification. [`Callbacks`] builds an observer out of
//! closures for callers that do not want to define a type.

use kiln_core::domain::status::StatusSnapshot;

use crate::error::PollError;

/// Receiver of polling events
///
/// Callbacks run on the polling task while the subscription gate is held,
/// so they should return quickly. Calling
/// [`Subscription::cancel`](crate::Subscription::cancel) from inside a
/// callback is allowed; `on_cancelled` then follows the running callback.
pub trait PollObserver: Send + 'static {
    /// Called for every successful status query, in the order received
    fn on_snapshot(&mut self, snapshot: &StatusSnapshot);

    /// Called once with the terminal snapshot, right after its `on_snapshot`
    fn on_complete(&mut self, snapshot: &StatusSnapshot);

    /// Called once when the operation fails
    fn on_error(&mut self, error: &PollError);

    /// Called once when the caller cancels the operation
    fn on_cancelled(&mut self) {}
}

type SnapshotFn = Box<dyn FnMut(&StatusSnapshot) + Send>;
type CompleteFn = Box<dyn FnOnce(&StatusSnapshot) + Send>;
type ErrorFn = Box<dyn FnOnce(&PollError) + Send>;
type CancelledFn = Box<dyn FnOnce() + Send>;

/// Closure-based [`PollObserver`]
///
/// # Example
/// ```
/// use kiln_poller::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .on_snapshot(|s| println!("status {}", s.application_status))
///     .on_complete(|s| println!("done: {:?}", s.outputs()))
///     .on_error(|e| eprintln!("failed: {e}"));
/// ```
#[derive(Default)]
pub struct Callbacks {
    snapshot: Option<SnapshotFn>,
    complete: Option<CompleteFn>,
    error: Option<ErrorFn>,
    cancelled: Option<CancelledFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_snapshot(mut self, f: impl FnMut(&StatusSnapshot) + Send + 'static) -> Self {
        self.snapshot = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(&StatusSnapshot) + Send + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&PollError) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn on_cancelled(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.cancelled = Some(Box::new(f));
        self
    }
}

impl PollObserver for Callbacks {
    fn on_snapshot(&mut self, snapshot: &StatusSnapshot) {
        if let Some(f) = self.snapshot.as_mut() {
            f(snapshot);
        }
    }

    fn on_complete(&mut self, snapshot: &StatusSnapshot) {
        if let Some(f) = self.complete.take() {
            f(snapshot);
        }
    }

    fn on_error(&mut self, error: &PollError) {
        if let Some(f) = self.error.take() {
            f(error);
        }
    }

    fn on_cancelled(&mut self) {
        if let Some(f) = self.cancelled.take() {
            f();
        }
    }
}
