//! Polling engine
//!
//! Drives repeated status queries for one job on a timer, classifies each
//! result and reports to the observer until the job finishes, the retry
//! budget runs out or the caller cancels. Each operation runs in its own
//! task and owns its counters; operations share nothing but the client and
//! the read-only credential.

use kiln_client::{ClientError, StatusQuery};
use kiln_core::domain::credential::Credential;
use kiln_core::domain::job::JobId;
use kiln_core::domain::status::StatusSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::{PendingPolicy, PollerConfig};
use crate::error::{AttemptError, PollError};
use crate::observer::PollObserver;
use crate::subscription::{Gate, PollResult, Subscription};

/// Classification of one status query
#[derive(Debug)]
enum PollOutcome {
    /// Valid response, job not finished yet
    StillRunning { status: u16 },
    /// Terminal snapshot received
    Succeeded(StatusSnapshot),
    Failed(AttemptError),
}

/// Per-operation counters
#[derive(Debug, Default)]
struct PollState {
    /// Retries consumed by failed attempts
    attempt_count: u32,
    last_error: Option<AttemptError>,
    /// Status queries issued so far
    polls: u32,
}

impl PollState {
    /// Records a failed attempt
    ///
    /// Returns the delay before the next attempt, or `None` once the budget is spent.
    fn record_failure(&mut self, error: AttemptError, config: &PollerConfig) -> Option<Duration> {
        self.attempt_count += 1;
        self.last_error = Some(error);

        if self.attempt_count > config.max_retries {
            None
        } else {
            Some(config.retry_delay(self.attempt_count))
        }
    }

    fn exhausted(&mut self) -> PollError {
        PollError::Exhausted {
            attempts: self.attempt_count,
            last: self
                .last_error
                .take()
                .unwrap_or(AttemptError::NotDoneYet { status: 0 }),
        }
    }
}

/// What the loop does after classifying a query
enum Step {
    Sleep(Duration),
    Stop(PollResult),
}

/// Starts and drives polling operations
#[derive(Clone)]
pub struct PollingEngine {
    client: Arc<dyn StatusQuery>,
    config: PollerConfig,
}

impl PollingEngine {
    /// Creates a new engine
    ///
    /// # Arguments
    /// * `client` - Anything that can query job status, usually a `JobClient`
    /// * `config` - Timing and retry parameters shared by every operation
    pub fn new(client: Arc<dyn StatusQuery>, config: PollerConfig) -> Self {
        Self { client, config }
    }

    /// Starts polling `job_id` and returns the caller's subscription
    ///
    /// The first query is issued immediately. Must be called from within a
    /// tokio runtime.
    pub fn start(
        &self,
        job_id: JobId,
        credential: Credential,
        observer: impl PollObserver,
    ) -> Subscription {
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        let gate = Gate::new(Box::new(observer));

        let run = PollRun {
            job_id: job_id.clone(),
            credential,
            client: Arc::clone(&self.client),
            config: self.config.clone(),
            token: token.clone(),
            gate: Arc::clone(&gate),
        };

        info!("Starting to poll job {} (operation {})", job_id, id);
        let span = info_span!("poll", operation = %id, job = %job_id);
        let handle = tokio::spawn(run.execute().instrument(span));

        Subscription::new(id, job_id, token, gate, handle)
    }
}

impl std::fmt::Debug for PollingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// State owned by the task of one polling operation
struct PollRun {
    job_id: JobId,
    credential: Credential,
    client: Arc<dyn StatusQuery>,
    config: PollerConfig,
    token: CancellationToken,
    gate: Arc<Gate>,
}

impl PollRun {
    async fn execute(self) {
        let mut state = PollState::default();

        loop {
            if self.token.is_cancelled() {
                self.finish_cancelled();
                return;
            }

            state.polls += 1;
            debug!("Querying status (poll {})", state.polls);
            let result = self.client.query_status(&self.job_id, &self.credential).await;

            // The query was allowed to finish, but its result no longer matters
            if self.token.is_cancelled() {
                debug!("Discarding status received after cancellation");
                self.finish_cancelled();
                return;
            }

            let Some(outcome) = self.classify(result) else {
                return;
            };

            let delay = match self.next_step(outcome, &mut state) {
                Step::Sleep(delay) => delay,
                Step::Stop(PollResult::Succeeded(snapshot)) => {
                    let status = snapshot.application_status;
                    if self.gate.complete(snapshot) {
                        info!("Job {} finished with status {}", self.job_id, status);
                    } else {
                        debug!("Job {} finished after polling was cancelled", self.job_id);
                    }
                    return;
                }
                Step::Stop(result) => {
                    self.gate.finish(result);
                    return;
                }
            };

            tokio::select! {
                _ = self.token.cancelled() => {
                    self.finish_cancelled();
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Classifies a query result
    ///
    /// Non-terminal snapshots are forwarded to the observer before the
    /// "not done yet" condition is evaluated; the terminal snapshot is
    /// delivered together with completion. Returns `None` when the
    /// operation ended during delivery.
    fn classify(&self, result: Result<StatusSnapshot, ClientError>) -> Option<PollOutcome> {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => return Some(PollOutcome::Failed(AttemptError::Client(e))),
        };

        if snapshot.is_terminal() {
            return Some(PollOutcome::Succeeded(snapshot));
        }

        if !self.gate.emit(&snapshot) {
            return None;
        }

        if snapshot.is_accepted() {
            Some(PollOutcome::StillRunning {
                status: snapshot.application_status,
            })
        } else {
            Some(PollOutcome::Failed(AttemptError::Rejected {
                status: snapshot.http_status,
                message: snapshot.message.unwrap_or_default(),
            }))
        }
    }

    fn next_step(&self, outcome: PollOutcome, state: &mut PollState) -> Step {
        match outcome {
            PollOutcome::Succeeded(snapshot) => Step::Stop(PollResult::Succeeded(snapshot)),
            PollOutcome::StillRunning { status } => match self.config.pending_policy {
                PendingPolicy::Poll => {
                    if let Some(max_polls) = self.config.max_polls
                        && state.polls >= max_polls
                    {
                        error!(
                            "Job {} still at status {} after {} polls",
                            self.job_id, status, state.polls
                        );
                        return Step::Stop(PollResult::Failed(PollError::Exhausted {
                            attempts: state.polls,
                            last: AttemptError::NotDoneYet { status },
                        }));
                    }
                    debug!("Job {} at status {}, polling again", self.job_id, status);
                    Step::Sleep(self.config.poll_delay)
                }
                PendingPolicy::Retry => self.retry(AttemptError::NotDoneYet { status }, state),
            },
            PollOutcome::Failed(AttemptError::Client(err)) if !err.is_retryable() => {
                error!("Polling job {} failed permanently: {}", self.job_id, err);
                Step::Stop(PollResult::Failed(PollError::Fatal(err)))
            }
            PollOutcome::Failed(err) => self.retry(err, state),
        }
    }

    fn retry(&self, err: AttemptError, state: &mut PollState) -> Step {
        let reason = err.to_string();
        match state.record_failure(err, &self.config) {
            Some(delay) => {
                warn!(
                    "Poll attempt for job {} failed ({}/{}): {}. Retrying in {:?}",
                    self.job_id, state.attempt_count, self.config.max_retries, reason, delay
                );
                Step::Sleep(delay)
            }
            None => {
                error!(
                    "Giving up on job {} after {} attempts: {}",
                    self.job_id, state.attempt_count, reason
                );
                Step::Stop(PollResult::Failed(state.exhausted()))
            }
        }
    }

    fn finish_cancelled(&self) {
        if self.gate.finish(PollResult::Cancelled) {
            info!("Polling of job {} cancelled", self.job_id);
        }
    }
}
