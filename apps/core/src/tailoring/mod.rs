//! Job Poller — drives a tailoring job from start to a terminal state.
//!
//! Lifecycle: idle → starting → polling → { completed | failed | cancelled }.
//! The poll loop is a spawned task ticking on a fixed interval; ticks are
//! serialized (the next tick begins only after the prior tick's async work
//! has settled). A single authoritative generation counter detects stale
//! in-flight responses: `cancel()` and a fresh `start()` bump it, and the
//! loop re-checks it around every suspension point, so a cancelled poller
//! performs zero further status calls and discards anything already in
//! flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::errors::TailoringError;
use crate::models::tailoring::{TailoringOutcome, TailoringRequest, TailoringState, TailoringStatus};
use crate::services::TailoringService;

/// Hook fired exactly once when a job reaches its completed state.
pub type CompletionHook = Arc<dyn Fn(&TailoringOutcome) + Send + Sync>;
/// Hook fired when the poller transitions to failed.
pub type FailureHook = Arc<dyn Fn(&TailoringError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerPhase {
    #[default]
    Idle,
    Starting,
    Polling,
    Completed,
    Failed,
}

/// Observable poller state, published through a watch channel.
#[derive(Debug, Clone, Default)]
pub struct PollerSnapshot {
    pub phase: PollerPhase,
    pub tailoring_id: Option<String>,
    pub status: Option<TailoringStatus>,
    pub error: Option<String>,
    pub outcome: Option<TailoringOutcome>,
}

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}

#[derive(Clone, Default)]
struct Hooks {
    on_complete: Option<CompletionHook>,
    on_failure: Option<FailureHook>,
}

pub struct JobPoller {
    service: Arc<dyn TailoringService>,
    config: PollConfig,
    tx: watch::Sender<PollerSnapshot>,
    generation: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
    last_request: Mutex<Option<TailoringRequest>>,
    hooks: Mutex<Hooks>,
}

impl JobPoller {
    pub fn new(service: Arc<dyn TailoringService>, config: PollConfig) -> Self {
        let (tx, _rx) = watch::channel(PollerSnapshot::default());
        Self {
            service,
            config,
            tx,
            generation: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
            last_request: Mutex::new(None),
            hooks: Mutex::new(Hooks::default()),
        }
    }

    pub fn snapshot(&self) -> PollerSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerSnapshot> {
        self.tx.subscribe()
    }

    pub fn on_complete(&self, hook: CompletionHook) {
        self.hooks.lock().unwrap().on_complete = Some(hook);
    }

    pub fn on_failure(&self, hook: FailureHook) {
        self.hooks.lock().unwrap().on_failure = Some(hook);
    }

    /// Starts the remote job and, on success, the poll loop.
    ///
    /// A start failure transitions straight to failed; the request is
    /// retained either way so `retry()` can re-submit it.
    pub async fn start(&self, request: TailoringRequest) -> Result<(), TailoringError> {
        *self.last_request.lock().unwrap() = Some(request.clone());

        // Supersede any previous run before touching the network.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_task();
        self.tx.send_replace(PollerSnapshot {
            phase: PollerPhase::Starting,
            ..PollerSnapshot::default()
        });

        match self.service.start(&request).await {
            Ok(outcome) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    return Ok(()); // superseded while starting; result discarded
                }
                let tailoring_id = outcome.tailoring_id.clone();
                info!("Tailoring job started: {tailoring_id}");
                self.tx.send_modify(|s| {
                    s.phase = PollerPhase::Polling;
                    s.tailoring_id = Some(tailoring_id.clone());
                });

                let handle = tokio::spawn(poll_loop(
                    self.service.clone(),
                    self.tx.clone(),
                    self.generation.clone(),
                    generation,
                    tailoring_id,
                    self.config.clone(),
                    self.hooks.lock().unwrap().clone(),
                ));
                *self.task.lock().unwrap() = Some(handle);
                Ok(())
            }
            Err(e) => {
                let error = TailoringError::Start(e.to_string());
                if self.generation.load(Ordering::SeqCst) == generation {
                    fail(&self.tx, &self.hooks.lock().unwrap().clone(), &error);
                }
                Err(error)
            }
        }
    }

    /// Stops polling immediately, best-effort notifies the remote job, and
    /// resets to idle. Any in-flight response is discarded by generation.
    pub async fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_task();

        let tailoring_id = self.tx.borrow().tailoring_id.clone();
        if let Some(tailoring_id) = tailoring_id {
            if let Err(e) = self.service.cancel(&tailoring_id).await {
                warn!("Failed to cancel tailoring {tailoring_id}: {e}");
            }
        }
        self.tx.send_replace(PollerSnapshot::default());
    }

    /// Re-submits the last request; no-op if none was ever submitted.
    pub async fn retry(&self) -> Result<(), TailoringError> {
        let request = self.last_request.lock().unwrap().clone();
        match request {
            Some(request) => self.start(request).await,
            None => Ok(()),
        }
    }

    fn abort_task(&self) {
        if let Some(handle) = self.task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for JobPoller {
    // A leaked interval timer is a defect: stop the loop on teardown even
    // when no terminal state was reached.
    fn drop(&mut self) {
        self.abort_task();
    }
}

fn fail(tx: &watch::Sender<PollerSnapshot>, hooks: &Hooks, error: &TailoringError) {
    warn!("Tailoring failed: {error}");
    tx.send_modify(|s| {
        s.phase = PollerPhase::Failed;
        s.error = Some(error.to_string());
    });
    if let Some(hook) = &hooks.on_failure {
        hook(error);
    }
}

async fn poll_loop(
    service: Arc<dyn TailoringService>,
    tx: watch::Sender<PollerSnapshot>,
    generation: Arc<AtomicU64>,
    my_generation: u64,
    tailoring_id: String,
    config: PollConfig,
    hooks: Hooks,
) {
    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate tick; first poll after one interval

    let mut attempts = 0u32;
    loop {
        interval.tick().await;
        if generation.load(Ordering::SeqCst) != my_generation {
            return;
        }

        attempts += 1;
        let status = match service.status(&tailoring_id).await {
            Ok(status) => status,
            Err(e) => {
                if generation.load(Ordering::SeqCst) == my_generation {
                    fail(&tx, &hooks, &TailoringError::Poll(e.to_string()));
                }
                return;
            }
        };
        if generation.load(Ordering::SeqCst) != my_generation {
            return; // stale response; poller has moved on
        }

        // Each poll response replaces the stored status wholesale.
        tx.send_modify(|s| s.status = Some(status.clone()));

        match status.status {
            TailoringState::Completed => {
                match service.result(&tailoring_id).await {
                    Ok(outcome) => {
                        if generation.load(Ordering::SeqCst) != my_generation {
                            return;
                        }
                        info!("Tailoring job completed: {tailoring_id}");
                        tx.send_modify(|s| {
                            s.phase = PollerPhase::Completed;
                            s.outcome = Some(outcome.clone());
                        });
                        if let Some(hook) = &hooks.on_complete {
                            hook(&outcome);
                        }
                    }
                    Err(e) => {
                        if generation.load(Ordering::SeqCst) == my_generation {
                            fail(&tx, &hooks, &TailoringError::Poll(e.to_string()));
                        }
                    }
                }
                return;
            }
            TailoringState::Failed => {
                let message = if status.message.is_empty() {
                    "Tailoring failed".to_string()
                } else {
                    status.message.clone()
                };
                fail(&tx, &hooks, &TailoringError::Failed(message));
                return;
            }
            TailoringState::Pending | TailoringState::Processing => {
                if attempts >= config.max_attempts {
                    fail(&tx, &hooks, &TailoringError::TimedOut);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock::MockTailoringService;
    use std::sync::atomic::AtomicU32;

    fn request() -> TailoringRequest {
        TailoringRequest {
            resume_id: "resume-1".to_string(),
            work_history_id: None,
            job_description: "Build distributed systems in Rust at planetary scale.".to_string(),
        }
    }

    fn poller(service: Arc<MockTailoringService>) -> JobPoller {
        JobPoller::new(service, PollConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn completes_once_after_intermediate_processing_ticks() {
        let service = Arc::new(MockTailoringService::with_script(vec![
            TailoringStatus::pending(),
            TailoringStatus::processing(30, "Analyzing job description"),
            TailoringStatus::processing(70, "Rewriting sections"),
            TailoringStatus::completed(),
        ]));
        let poller = poller(service.clone());

        let completions = Arc::new(AtomicU32::new(0));
        let counter = completions.clone();
        poller.on_complete(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        poller.start(request()).await.unwrap();
        let mut rx = poller.subscribe();
        rx.wait_for(|s| s.phase == PollerPhase::Completed)
            .await
            .unwrap();

        assert_eq!(service.result_call_count(), 1);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        let snapshot = poller.snapshot();
        assert!(snapshot.outcome.is_some());
        assert!(snapshot.error.is_none());

        // No further polling after the terminal transition.
        let polled = service.status_call_count();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.status_call_count(), polled);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_surfaces_its_message() {
        let service = Arc::new(MockTailoringService::with_script(vec![
            TailoringStatus::processing(10, "Working"),
            TailoringStatus::failed("Model capacity exceeded"),
        ]));
        let poller = poller(service.clone());

        poller.start(request()).await.unwrap();
        let mut rx = poller.subscribe();
        let snapshot = rx
            .wait_for(|s| s.phase == PollerPhase::Failed)
            .await
            .unwrap()
            .clone();

        assert_eq!(snapshot.error.as_deref(), Some("Model capacity exceeded"));
        assert_eq!(service.result_call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_the_attempt_ceiling_with_no_extra_tick() {
        let service = Arc::new(MockTailoringService::with_script(vec![
            TailoringStatus::processing(50, "Still working"),
        ]));
        let poller = poller(service.clone());

        poller.start(request()).await.unwrap();
        let mut rx = poller.subscribe();
        let snapshot = rx
            .wait_for(|s| s.phase == PollerPhase::Failed)
            .await
            .unwrap()
            .clone();

        assert_eq!(snapshot.error.as_deref(), Some("Tailoring timed out"));
        assert_eq!(service.status_call_count(), 60);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(service.status_call_count(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_polling_immediately_and_resets_to_idle() {
        let service = Arc::new(MockTailoringService::new());
        let poller = poller(service.clone());

        poller.start(request()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(service.status_call_count() >= 2);

        poller.cancel().await;
        let after_cancel = service.status_call_count();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.status_call_count(), after_cancel);
        assert_eq!(service.cancelled_ids().len(), 1);
        assert_eq!(poller.snapshot().phase, PollerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn start_failure_transitions_to_failed_and_retry_resubmits() {
        let service = Arc::new(MockTailoringService::with_script(vec![
            TailoringStatus::completed(),
        ]));
        let poller = poller(service.clone());

        service.fail_start(true);
        let err = poller.start(request()).await.unwrap_err();
        assert!(matches!(err, TailoringError::Start(_)));
        assert_eq!(poller.snapshot().phase, PollerPhase::Failed);

        service.fail_start(false);
        poller.retry().await.unwrap();
        let mut rx = poller.subscribe();
        rx.wait_for(|s| s.phase == PollerPhase::Completed)
            .await
            .unwrap();
        assert_eq!(service.started_requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_without_a_prior_request_is_a_no_op() {
        let service = Arc::new(MockTailoringService::new());
        let poller = poller(service.clone());
        poller.retry().await.unwrap();
        assert_eq!(poller.snapshot().phase, PollerPhase::Idle);
        assert_eq!(service.status_call_count(), 0);
    }
}
