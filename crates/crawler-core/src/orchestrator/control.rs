//! Pipeline supervisor and cycle loop.
//!
//! `Orchestrator` is a cheap handle. Start and stop are commands sent to a
//! single supervisor task that owns the active loop's `CancellationToken`;
//! status reads go straight to the shared state.
//!
//! Every loop carries a `drained` token that fires when the loop task ends.
//! A new loop waits on its predecessor's token before its first cycle, so a
//! stop followed by a start never has two loops running steps at once.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::state::{PipelineSnapshot, PipelineState, StartParams};
use super::steps::PipelineSteps;
use crate::config::PipelineConfig;
use crate::error::{CrawlError, Result};
use crate::types::PipelineStep;

type SharedState = Arc<Mutex<PipelineState>>;

/// `drained` token of the most recently started loop.
type LastLoop = Arc<Mutex<Option<CancellationToken>>>;

fn lock<T>(shared: &Mutex<T>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started(PipelineSnapshot),
    /// The pipeline was already running; nothing changed.
    AlreadyRunning(PipelineSnapshot),
}

impl StartOutcome {
    pub fn snapshot(&self) -> &PipelineSnapshot {
        match self {
            StartOutcome::Started(s) | StartOutcome::AlreadyRunning(s) => s,
        }
    }

    pub fn was_started(&self) -> bool {
        matches!(self, StartOutcome::Started(_))
    }
}

enum Command {
    Start {
        params: StartParams,
        reply: oneshot::Sender<StartOutcome>,
    },
    Stop {
        reply: oneshot::Sender<(PipelineSnapshot, Option<CancellationToken>)>,
    },
}

// ---------------------------------------------------------------------------
// Orchestrator handle
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Orchestrator {
    commands: mpsc::Sender<Command>,
    state: SharedState,
    last_loop: LastLoop,
    steps: Arc<dyn PipelineSteps>,
}

impl Orchestrator {
    /// Create the orchestrator and spawn its supervisor on the current
    /// runtime.
    pub fn spawn(steps: Arc<dyn PipelineSteps>, config: &PipelineConfig) -> Self {
        let state = Arc::new(Mutex::new(PipelineState::new(config.log_capacity)));
        let last_loop: LastLoop = Arc::new(Mutex::new(None));
        let (tx, rx) = mpsc::channel(16);
        let supervisor = Supervisor {
            state: state.clone(),
            last_loop: last_loop.clone(),
            steps: steps.clone(),
            pause: config.cycle_pause(),
            active: None,
        };
        tokio::spawn(supervisor.run(rx));
        Self {
            commands: tx,
            state,
            last_loop,
            steps,
        }
    }

    /// Start the cycle loop. Returns as soon as the loop is spawned; a
    /// second start while running changes nothing.
    pub async fn start(&self, params: StartParams) -> Result<StartOutcome> {
        params.validate()?;
        if self.is_running() {
            return Ok(StartOutcome::AlreadyRunning(self.status()));
        }
        self.steps.check_ready().await?;

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Start { params, reply })
            .await
            .map_err(|_| CrawlError::PipelineUnavailable)?;
        rx.await.map_err(|_| CrawlError::PipelineUnavailable)
    }

    /// Request a stop. `running` is false on return; the step in flight
    /// finishes in the background and no new cycle starts.
    pub async fn stop(&self) -> Result<PipelineSnapshot> {
        let (snapshot, _) = self.request_stop().await?;
        Ok(snapshot)
    }

    /// Stop and wait until the loop has drained.
    pub async fn stop_and_wait(&self) -> Result<PipelineSnapshot> {
        let (_, drained) = self.request_stop().await?;
        if let Some(drained) = drained {
            drained.cancelled().await;
        }
        Ok(self.status())
    }

    pub fn status(&self) -> PipelineSnapshot {
        lock(&self.state).snapshot()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Running, or stopped with a step still finishing.
    pub fn is_busy(&self) -> bool {
        self.is_running()
            || lock(&self.last_loop)
                .as_ref()
                .is_some_and(|drained| !drained.is_cancelled())
    }

    async fn request_stop(&self) -> Result<(PipelineSnapshot, Option<CancellationToken>)> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Stop { reply })
            .await
            .map_err(|_| CrawlError::PipelineUnavailable)?;
        rx.await.map_err(|_| CrawlError::PipelineUnavailable)
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

struct Supervisor {
    state: SharedState,
    last_loop: LastLoop,
    steps: Arc<dyn PipelineSteps>,
    pause: Duration,
    /// Cancellation token of the running loop.
    active: Option<CancellationToken>,
}

impl Supervisor {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Start { params, reply } => {
                    let outcome = self.start(params);
                    let _ = reply.send(outcome);
                }
                Command::Stop { reply } => {
                    let stopped = self.stop();
                    let _ = reply.send(stopped);
                }
            }
        }
        // Every handle dropped.
        if let Some(token) = self.active.take() {
            token.cancel();
        }
        debug!("pipeline supervisor exited");
    }

    fn start(&mut self, params: StartParams) -> StartOutcome {
        let (generation, snapshot) = {
            let mut st = lock(&self.state);
            if st.running {
                return StartOutcome::AlreadyRunning(st.snapshot());
            }
            st.running = true;
            st.generation += 1;
            st.current_step = PipelineStep::Idle;
            st.params = Some(params.clone());
            st.log("pipeline started");
            (st.generation, st.snapshot())
        };

        // A previous loop may still be finishing a step. Its writes are
        // fenced off by the generation; the new loop waits for it to drain.
        let token = CancellationToken::new();
        let drained = CancellationToken::new();
        let predecessor = lock(&self.last_loop).replace(drained.clone());
        let ctx = LoopContext {
            generation,
            state: self.state.clone(),
        };
        tokio::spawn(run_loop(
            ctx,
            self.steps.clone(),
            params,
            self.pause,
            token.clone(),
            predecessor,
            drained,
        ));
        self.active = Some(token);
        StartOutcome::Started(snapshot)
    }

    fn stop(&mut self) -> (PipelineSnapshot, Option<CancellationToken>) {
        let drained = lock(&self.last_loop).clone();
        let mut st = lock(&self.state);
        if !st.running {
            return (st.snapshot(), drained);
        }
        st.running = false;
        st.log("pipeline stop requested");
        if let Some(token) = self.active.take() {
            token.cancel();
        }
        (st.snapshot(), drained)
    }
}

// ---------------------------------------------------------------------------
// Cycle loop
// ---------------------------------------------------------------------------

struct LoopContext {
    generation: u64,
    state: SharedState,
}

impl LoopContext {
    /// Apply `f` unless a newer start has superseded this loop.
    fn update(&self, f: impl FnOnce(&mut PipelineState)) -> bool {
        let mut st = lock(&self.state);
        if st.generation != self.generation {
            debug!(
                stale = self.generation,
                current = st.generation,
                "dropping write from superseded loop"
            );
            return false;
        }
        f(&mut st);
        true
    }

    fn enter(&self, step: PipelineStep, message: String) {
        self.update(|st| {
            st.current_step = step;
            st.log(message);
        });
    }

    fn log(&self, message: String) {
        self.update(|st| st.log(message));
    }
}

async fn run_loop(
    ctx: LoopContext,
    steps: Arc<dyn PipelineSteps>,
    params: StartParams,
    pause: Duration,
    token: CancellationToken,
    predecessor: Option<CancellationToken>,
    drained: CancellationToken,
) {
    // Fires on every exit path, including a panic or an abort.
    let _drained = drained.drop_guard();

    // Even when stopped while waiting, this loop drains only after its
    // predecessor has, so waiting on the newest token covers the whole chain.
    if let Some(previous) = predecessor.filter(|p| !p.is_cancelled()) {
        ctx.log("waiting for the previous loop to finish its step".to_string());
        previous.cancelled().await;
    }

    while !token.is_cancelled() {
        run_cycle(&ctx, &steps, &params, &token).await;
        if token.is_cancelled() {
            break;
        }
        ctx.update(|st| {
            st.cycles += 1;
            st.last_cycle_at = Some(Utc::now());
            st.current_step = PipelineStep::Idle;
        });

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = token.cancelled() => break,
        }
    }
    ctx.update(|st| {
        st.current_step = PipelineStep::Idle;
        st.log("pipeline stopped");
    });
}

async fn run_cycle(
    ctx: &LoopContext,
    steps: &Arc<dyn PipelineSteps>,
    params: &StartParams,
    token: &CancellationToken,
) {
    let region = params.seed_region;
    let count = params.seed_count;
    ctx.enter(PipelineStep::Seed, format!("seed ({region}, {count})"));
    let s = steps.clone();
    match contained(async move { s.seed(region, count).await }).await {
        Ok(r) => ctx.log(format!(
            "seed: {} matches analyzed, {} unique identifiers, {} new players",
            r.matches_analyzed, r.unique_identifiers_seen, r.new_players_added
        )),
        Err(e) => ctx.log(format!("seed error: {e}")),
    }
    if token.is_cancelled() {
        return;
    }

    ctx.enter(PipelineStep::Process, "process pending players".to_string());
    let s = steps.clone();
    match contained(async move { s.process().await }).await {
        Ok(r) => ctx.log(format!(
            "process: {} players processed, {} matches collected, {} failed",
            r.players_processed, r.matches_collected, r.players_failed
        )),
        Err(e) => ctx.log(format!("process error: {e}")),
    }
    if token.is_cancelled() {
        return;
    }

    let quota = params.max_external_calls_per_cycle;
    ctx.enter(PipelineStep::Sync, format!("sync (quota {quota})"));
    let s = steps.clone();
    match contained(async move { s.sync(quota).await }).await {
        Ok(r) => ctx.log(format!(
            "sync: {} identifiers, {} created, {} updated, {} external calls",
            r.total_identifiers, r.accounts_created, r.accounts_updated, r.external_calls
        )),
        Err(e) => ctx.log(format!("sync error: {e}")),
    }
}

/// Run a step on its own task so an error or a panic stays inside the step.
async fn contained<T, F>(step: F) -> std::result::Result<T, String>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(step).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) if e.is_panic() => Err("step panicked".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
