//! Job orchestrator: one actor task owns the job state machine.
//!
//! ```text
//! Idle ──submit──▶ (submitting) ──accepted──▶ Generating ──poll──▶ Succeeded
//!  ▲                    │                        │    │        └──▶ Failed
//!  │                    └──rejected──▶ Failed    │    └─budget──▶ Failed (timeout)
//!  └──reset── any terminal ◀──────cancel─────────┘
//! ```
//!
//! Callers hold an [`OrchestratorHandle`]: commands go over an mpsc channel
//! with oneshot replies, state comes back over a `watch` channel as a
//! [`Snapshot`]. Submission and polling run in a per-job driver task that
//! reports back to the actor with events tagged by the job's ticket; events
//! from any other ticket are dropped, so an aborted or superseded driver can
//! never touch the current job.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use reportgen_core::config::PollSettings;
use reportgen_core::{ErrorDetail, GenerationRequest, GenerationResult, JobId, Phase};

use crate::error::{OrchestratorError, ServiceError};
use crate::service::{JobService, JobStatus};

pub const CODE_REJECTED: &str = "rejected";
pub const CODE_EXECUTION_FAILED: &str = "execution_failed";
pub const CODE_TIMEOUT: &str = "timeout";
pub const CODE_CONNECTIVITY: &str = "connectivity";
pub const CODE_PROTOCOL: &str = "protocol";

pub const REJECTED_MESSAGE: &str = "The report could not be started. Please try again.";
pub const EXECUTION_FAILED_MESSAGE: &str = "Report generation failed. Please try again.";
pub const TIMEOUT_MESSAGE: &str = "Report generation timed out. Please try again.";
pub const CONNECTIVITY_MESSAGE: &str =
    "Lost contact with the report service. Check your connection and try again.";
pub const PROTOCOL_MESSAGE: &str = "The report service sent an unexpected response.";

/// Highest progress shown before the job actually succeeds.
pub const PROGRESS_CEILING: u8 = 95;

// ---------------------------------------------------------------------------
// Configuration and snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub progress_tick: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&PollSettings::default())
    }
}

impl From<&PollSettings> for OrchestratorConfig {
    fn from(settings: &PollSettings) -> Self {
        Self {
            poll_interval: settings.interval(),
            max_attempts: settings.max_attempts,
            progress_tick: settings.progress_tick(),
        }
    }
}

impl OrchestratorConfig {
    /// Longest a job may stay in `Generating`.
    pub fn budget(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }
}

/// What observers see: the phase plus a 0–100 progress estimate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub phase: Phase,
    pub progress: u8,
}

// ---------------------------------------------------------------------------
// Single poll
// ---------------------------------------------------------------------------

/// Classified answer to one status request.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Pending,
    /// Transport failure; treated as pending for this attempt.
    Unreachable(String),
    Succeeded(GenerationResult),
    Failed(ErrorDetail),
}

impl PollOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollOutcome::Succeeded(_) | PollOutcome::Failed(_))
    }
}

/// Ask the service once for the job's status.
pub async fn poll(service: &dyn JobService, job_id: &JobId) -> PollOutcome {
    match service.status(job_id).await {
        Ok(JobStatus::Running) => PollOutcome::Pending,
        Ok(JobStatus::Succeeded(result)) => PollOutcome::Succeeded(result),
        Ok(JobStatus::Failed(detail)) => {
            PollOutcome::Failed(with_fallback(detail, EXECUTION_FAILED_MESSAGE, CODE_EXECUTION_FAILED))
        }
        Err(ServiceError::Transport(reason)) => {
            tracing::warn!(job_id = %job_id, error = %reason, "status check unreachable");
            PollOutcome::Unreachable(reason)
        }
        Err(ServiceError::Rejected(detail)) => {
            PollOutcome::Failed(with_fallback(detail, EXECUTION_FAILED_MESSAGE, CODE_REJECTED))
        }
        Err(ServiceError::Protocol(reason)) => {
            tracing::error!(job_id = %job_id, error = %reason, "unusable status response");
            PollOutcome::Failed(ErrorDetail::with_code(PROTOCOL_MESSAGE, CODE_PROTOCOL))
        }
    }
}

/// Map a failed submission to the detail users see.
fn submit_failure(err: ServiceError) -> ErrorDetail {
    match err {
        ServiceError::Rejected(detail) => with_fallback(detail, REJECTED_MESSAGE, CODE_REJECTED),
        ServiceError::Transport(reason) => {
            tracing::warn!(error = %reason, "submission unreachable");
            ErrorDetail::with_code(CONNECTIVITY_MESSAGE, CODE_CONNECTIVITY)
        }
        ServiceError::Protocol(reason) => {
            tracing::error!(error = %reason, "unusable submission response");
            ErrorDetail::with_code(PROTOCOL_MESSAGE, CODE_PROTOCOL)
        }
    }
}

/// Keep the collaborator's message and code when present.
fn with_fallback(detail: ErrorDetail, message: &str, code: &str) -> ErrorDetail {
    let message = if detail.message.trim().is_empty() {
        message.to_string()
    } else {
        detail.message
    };
    let code = detail
        .code
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| code.to_string());
    ErrorDetail::with_code(message, code)
}

/// Time-driven estimate in `[0, PROGRESS_CEILING]`: quick at first, then
/// flattening out as the attempt budget is used up.
pub fn estimate_progress(elapsed: Duration, budget: Duration) -> u8 {
    if budget.is_zero() {
        return PROGRESS_CEILING;
    }
    let fraction = elapsed.as_secs_f64() / budget.as_secs_f64();
    let curve = 1.0 - (-6.0 * fraction).exp();
    let ceiling = f64::from(PROGRESS_CEILING);
    (curve * ceiling).floor().clamp(0.0, ceiling) as u8
}

// ---------------------------------------------------------------------------
// Driver: submission and the poll loop for one ticket
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum DriverEvent {
    Accepted {
        ticket: u64,
        job_id: JobId,
    },
    SubmitFailed {
        ticket: u64,
        error: ErrorDetail,
    },
    Polled {
        ticket: u64,
        attempt: u32,
        outcome: PollOutcome,
    },
    Exhausted {
        ticket: u64,
        error: ErrorDetail,
    },
}

impl DriverEvent {
    fn ticket(&self) -> u64 {
        match self {
            DriverEvent::Accepted { ticket, .. }
            | DriverEvent::SubmitFailed { ticket, .. }
            | DriverEvent::Polled { ticket, .. }
            | DriverEvent::Exhausted { ticket, .. } => *ticket,
        }
    }
}

async fn drive(
    service: Arc<dyn JobService>,
    request: GenerationRequest,
    config: OrchestratorConfig,
    ticket: u64,
    events: mpsc::UnboundedSender<DriverEvent>,
) {
    let job_id = match service.submit(&request).await {
        Ok(job_id) => job_id,
        Err(err) => {
            let _ = events.send(DriverEvent::SubmitFailed {
                ticket,
                error: submit_failure(err),
            });
            return;
        }
    };
    let accepted = DriverEvent::Accepted {
        ticket,
        job_id: job_id.clone(),
    };
    if events.send(accepted).is_err() {
        return;
    }

    let mut last_unreachable = false;
    for attempt in 1..=config.max_attempts {
        tokio::time::sleep(config.poll_interval).await;
        let outcome = poll(service.as_ref(), &job_id).await;
        let terminal = outcome.is_terminal();
        last_unreachable = matches!(outcome, PollOutcome::Unreachable(_));
        tracing::debug!(job_id = %job_id, attempt, terminal, "polled job");
        let sent = events.send(DriverEvent::Polled {
            ticket,
            attempt,
            outcome,
        });
        if sent.is_err() || terminal {
            return;
        }
    }

    let error = if last_unreachable {
        ErrorDetail::with_code(CONNECTIVITY_MESSAGE, CODE_CONNECTIVITY)
    } else {
        ErrorDetail::with_code(TIMEOUT_MESSAGE, CODE_TIMEOUT)
    };
    let _ = events.send(DriverEvent::Exhausted { ticket, error });
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

enum Command {
    Submit {
        request: GenerationRequest,
        respond_to: oneshot::Sender<Result<JobId, OrchestratorError>>,
    },
    Reset {
        respond_to: oneshot::Sender<Result<(), OrchestratorError>>,
    },
    Cancel {
        respond_to: oneshot::Sender<()>,
    },
    Shutdown,
}

/// The in-flight submission or job.
struct ActiveJob {
    ticket: u64,
    driver: JoinHandle<()>,
    respond_to: Option<oneshot::Sender<Result<JobId, OrchestratorError>>>,
    /// Set once the service accepted the job.
    job_id: Option<JobId>,
    started: Instant,
    attempt: u32,
}

struct Actor {
    service: Arc<dyn JobService>,
    config: OrchestratorConfig,
    snapshot: watch::Sender<Snapshot>,
    events_tx: mpsc::UnboundedSender<DriverEvent>,
    next_ticket: u64,
    active: Option<ActiveJob>,
}

impl Actor {
    fn new(
        service: Arc<dyn JobService>,
        config: OrchestratorConfig,
    ) -> (
        Self,
        watch::Receiver<Snapshot>,
        mpsc::UnboundedReceiver<DriverEvent>,
    ) {
        let (snapshot, snapshots) = watch::channel(Snapshot::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let actor = Self {
            service,
            config,
            snapshot,
            events_tx,
            next_ticket: 1,
            active: None,
        };
        (actor, snapshots, events_rx)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::UnboundedReceiver<DriverEvent>,
    ) {
        let period = self.config.progress_tick.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = events.recv() => self.handle_event(event),
                _ = ticker.tick(), if self.is_generating() => self.tick(),
            }
        }

        if let Some(job) = self.active.take() {
            job.driver.abort();
        }
        tracing::debug!("orchestrator stopped");
    }

    fn phase(&self) -> Phase {
        self.snapshot.borrow().phase.clone()
    }

    fn progress(&self) -> u8 {
        self.snapshot.borrow().progress
    }

    fn publish(&self, phase: Phase, progress: u8) {
        self.snapshot.send_replace(Snapshot { phase, progress });
    }

    fn is_generating(&self) -> bool {
        self.active.as_ref().is_some_and(|job| job.job_id.is_some())
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit {
                request,
                respond_to,
            } => {
                let outcome = self.start(request);
                match outcome {
                    Ok(()) => {
                        if let Some(job) = self.active.as_mut() {
                            job.respond_to = Some(respond_to);
                        }
                    }
                    Err(err) => {
                        let _ = respond_to.send(Err(err));
                    }
                }
            }
            Command::Reset { respond_to } => {
                let _ = respond_to.send(self.reset());
            }
            Command::Cancel { respond_to } => {
                self.cancel();
                let _ = respond_to.send(());
            }
            Command::Shutdown => {}
        }
    }

    fn start(&mut self, mut request: GenerationRequest) -> Result<(), OrchestratorError> {
        request.normalize_recipients();
        request.validate()?;
        if self.active.is_some() {
            return Err(OrchestratorError::Busy);
        }
        let phase = self.phase();
        if phase != Phase::Idle {
            return Err(OrchestratorError::NotIdle { phase: phase.name() });
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        tracing::info!(
            ticket,
            kind = %request.kind,
            area = %request.scope.label(),
            lookback_days = request.lookback_days,
            "submitting report"
        );
        let driver = tokio::spawn(drive(
            self.service.clone(),
            request,
            self.config,
            ticket,
            self.events_tx.clone(),
        ));
        self.active = Some(ActiveJob {
            ticket,
            driver,
            respond_to: None,
            job_id: None,
            started: Instant::now(),
            attempt: 0,
        });
        Ok(())
    }

    fn reset(&mut self) -> Result<(), OrchestratorError> {
        if self.active.is_some() {
            return Err(OrchestratorError::Busy);
        }
        if self.phase().is_terminal() {
            tracing::debug!("orchestrator reset to idle");
            self.publish(Phase::Idle, 0);
        }
        Ok(())
    }

    fn cancel(&mut self) {
        let Some(job) = self.active.take() else {
            return;
        };
        job.driver.abort();
        tracing::info!(ticket = job.ticket, job_id = ?job.job_id, "report cancelled");
        self.publish(Phase::Cancelled, self.progress());
        if let Some(respond_to) = job.respond_to {
            let _ = respond_to.send(Err(OrchestratorError::Cancelled));
        }
    }

    fn handle_event(&mut self, event: DriverEvent) {
        let Some(active_ticket) = self.active.as_ref().map(|job| job.ticket) else {
            tracing::debug!(ticket = event.ticket(), "ignoring event with no active job");
            return;
        };
        if event.ticket() != active_ticket {
            tracing::debug!(
                ticket = event.ticket(),
                active_ticket,
                "ignoring stale driver event"
            );
            return;
        }

        match event {
            DriverEvent::Accepted { job_id, .. } => {
                tracing::info!(job_id = %job_id, "report accepted");
                let respond_to = self.active.as_mut().and_then(|job| {
                    job.job_id = Some(job_id.clone());
                    job.started = Instant::now();
                    job.respond_to.take()
                });
                self.publish(
                    Phase::Generating {
                        job_id: job_id.clone(),
                        attempt: 0,
                    },
                    0,
                );
                if let Some(respond_to) = respond_to {
                    let _ = respond_to.send(Ok(job_id));
                }
            }
            DriverEvent::SubmitFailed { error, .. } => {
                tracing::warn!(code = ?error.code, "report submission failed");
                let respond_to = self.active.take().and_then(|job| job.respond_to);
                self.publish(Phase::Failed { error: error.clone() }, 0);
                if let Some(respond_to) = respond_to {
                    let _ = respond_to.send(Err(OrchestratorError::Rejected(error)));
                }
            }
            DriverEvent::Polled {
                attempt, outcome, ..
            } => match outcome {
                PollOutcome::Pending | PollOutcome::Unreachable(_) => {
                    let Some(job) = self.active.as_mut() else {
                        return;
                    };
                    job.attempt = attempt;
                    let Some(job_id) = job.job_id.clone() else {
                        return;
                    };
                    let progress = self.current_estimate();
                    self.publish(Phase::Generating { job_id, attempt }, progress);
                }
                PollOutcome::Succeeded(result) => {
                    let job = self.active.take();
                    tracing::info!(
                        job_id = ?job.and_then(|j| j.job_id),
                        attempt,
                        "report succeeded"
                    );
                    self.publish(Phase::Succeeded { result }, 100);
                }
                PollOutcome::Failed(error) => {
                    self.active = None;
                    tracing::warn!(attempt, code = ?error.code, "report failed");
                    let progress = self.progress();
                    self.publish(Phase::Failed { error }, progress);
                }
            },
            DriverEvent::Exhausted { error, .. } => {
                self.active = None;
                tracing::warn!(
                    max_attempts = self.config.max_attempts,
                    code = ?error.code,
                    "poll budget exhausted"
                );
                let progress = self.progress();
                self.publish(Phase::Failed { error }, progress);
            }
        }
    }

    fn tick(&mut self) {
        let progress = self.current_estimate();
        if progress > self.progress() {
            self.snapshot.send_modify(|s| s.progress = progress);
        }
    }

    /// Estimate from wall time or attempts used, whichever is further along;
    /// never below what observers have already seen.
    fn current_estimate(&self) -> u8 {
        let Some(job) = self.active.as_ref() else {
            return self.progress();
        };
        let by_attempts = self.config.poll_interval * job.attempt;
        let elapsed = job.started.elapsed().max(by_attempts);
        estimate_progress(elapsed, self.config.budget()).max(self.progress())
    }
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

/// Spawns orchestrator actors.
pub struct Orchestrator;

impl Orchestrator {
    /// Start an actor on the current tokio runtime. The actor stops when the
    /// last handle is dropped or [`OrchestratorHandle::shutdown`] is called.
    pub fn spawn(service: Arc<dyn JobService>, config: OrchestratorConfig) -> OrchestratorHandle {
        let (actor, snapshots, events) = Actor::new(service, config);
        let (commands, commands_rx) = mpsc::channel(16);
        tokio::spawn(actor.run(commands_rx, events));
        OrchestratorHandle {
            commands,
            snapshots,
        }
    }
}

/// Cheap to clone; every clone talks to the same actor.
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

impl OrchestratorHandle {
    /// Validate and submit `request`. Resolves once the service accepted or
    /// refused it; polling then continues in the background.
    pub async fn submit(&self, request: GenerationRequest) -> Result<JobId, OrchestratorError> {
        let (respond_to, response) = oneshot::channel();
        self.send(Command::Submit {
            request,
            respond_to,
        })
        .await?;
        response.await.map_err(|_| OrchestratorError::ActorGone)?
    }

    /// Terminal phase back to `Idle`. A no-op from `Idle`; an error while a
    /// job is in flight.
    pub async fn reset(&self) -> Result<(), OrchestratorError> {
        let (respond_to, response) = oneshot::channel();
        self.send(Command::Reset { respond_to }).await?;
        response.await.map_err(|_| OrchestratorError::ActorGone)?
    }

    /// Stop the in-flight submission or job, if any. Idempotent.
    pub async fn cancel(&self) -> Result<(), OrchestratorError> {
        let (respond_to, response) = oneshot::channel();
        self.send(Command::Cancel { respond_to }).await?;
        response.await.map_err(|_| OrchestratorError::ActorGone)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Wait until the phase is terminal and return that snapshot.
    pub async fn wait_terminal(&self) -> Result<Snapshot, OrchestratorError> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|s| s.phase.is_terminal())
            .await
            .map_err(|_| OrchestratorError::ActorGone)?;
        Ok(snapshot.clone())
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    async fn send(&self, command: Command) -> Result<(), OrchestratorError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| OrchestratorError::ActorGone)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
