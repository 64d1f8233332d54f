use crate::debounce::{DebounceState, DEFAULT_DEBOUNCE};
use crate::error::{Result, SearchError};
use crate::lexical::filter_lexical;
use crate::merge::{merge, MergePolicy, ResultSource};
use crate::semantic::{match_semantic, SemanticMatcher, SemanticOutcome};
use log::{debug, info, warn};
use nexus_catalog::{Catalog, MatchResult, SearchState};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time;

pub const DEFAULT_SEMANTIC_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub debounce: Duration,
    pub merge_policy: MergePolicy,
    pub semantic_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            merge_policy: MergePolicy::default(),
            semantic_timeout: DEFAULT_SEMANTIC_TIMEOUT,
        }
    }
}

/// Semantic side of a published update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticStatus {
    /// No semantic call for this pass
    Skipped,
    /// Lexical result shown while the semantic call is in flight
    Pending,
    /// Semantic ids replaced the lexical result
    Applied,
    /// Semantic call failed or matched nothing usable
    Fallback,
}

/// A result the presentation layer should display
#[derive(Debug, Clone, Serialize)]
pub struct MatchUpdate {
    pub epoch: u64,
    pub state: SearchState,
    pub result: MatchResult,
    pub source: ResultSource,
    pub semantic: SemanticStatus,
}

impl MatchUpdate {
    /// No further update is expected for this epoch
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.semantic != SemanticStatus::Pending
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineHealth {
    pub epoch: u64,
    pub passes: u64,
    pub semantic_requests: u64,
    pub semantic_failures: u64,
    pub stale_responses: u64,
    pub pending: bool,
    pub in_flight: bool,
}

impl PipelineHealth {
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !self.pending && !self.in_flight
    }
}

enum PipelineCommand {
    Update(SearchState),
    Flush,
    Sync(oneshot::Sender<()>),
    Shutdown,
}

struct SemanticCompletion {
    epoch: u64,
    state: SearchState,
    lexical: MatchResult,
    outcome: SemanticOutcome,
}

/// Debounced, cancelable query pipeline.
///
/// One actor task owns the debounce timer and the epoch counter. Every
/// state change bumps the epoch and aborts the in-flight semantic call;
/// a completion tagged with an older epoch is dropped, so the latest input
/// always decides what is displayed.
#[derive(Clone)]
pub struct QueryPipeline {
    inner: Arc<QueryPipelineInner>,
}

struct QueryPipelineInner {
    command_tx: mpsc::Sender<PipelineCommand>,
    update_tx: broadcast::Sender<MatchUpdate>,
    current_tx: watch::Sender<MatchUpdate>,
    health_tx: watch::Sender<PipelineHealth>,
}

impl QueryPipeline {
    /// Start the actor. The default state is filtered right away, without
    /// debouncing, and published as epoch 0.
    #[must_use]
    pub fn start(
        catalog: Arc<Catalog>,
        matcher: Option<Arc<dyn SemanticMatcher>>,
        config: PipelineConfig,
    ) -> Self {
        let initial_state = SearchState::default();
        let initial = MatchUpdate {
            epoch: 0,
            result: filter_lexical(&catalog, &initial_state.query, initial_state.category),
            state: initial_state,
            source: ResultSource::Lexical,
            semantic: SemanticStatus::Skipped,
        };

        let (command_tx, command_rx) = mpsc::channel(64);
        let (update_tx, _) = broadcast::channel(64);
        let (current_tx, _) = watch::channel(initial);
        let (health_tx, _) = watch::channel(PipelineHealth::default());

        let merge_policy = if matcher.is_some() {
            config.merge_policy
        } else {
            MergePolicy::LexicalOnly
        };
        info!(
            "Query pipeline started: {} tools, debounce={:?}, policy={}",
            catalog.len(),
            config.debounce,
            merge_policy
        );

        let actor = PipelineActor {
            catalog,
            matcher,
            config: PipelineConfig {
                merge_policy,
                ..config
            },
            update_tx: update_tx.clone(),
            current_tx: current_tx.clone(),
            health_tx: health_tx.clone(),
            debounce: DebounceState::new(config.debounce),
            health: PipelineHealth::default(),
            in_flight: None,
        };
        tokio::spawn(actor.run(command_rx));

        Self {
            inner: Arc::new(QueryPipelineInner {
                command_tx,
                update_tx,
                current_tx,
                health_tx,
            }),
        }
    }

    /// Record a state change; the pass runs once input is quiet
    pub async fn update(&self, state: SearchState) -> Result<()> {
        self.send(PipelineCommand::Update(state)).await
    }

    /// Run the pending pass now instead of waiting out the window
    pub async fn flush(&self) -> Result<()> {
        self.send(PipelineCommand::Flush).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(PipelineCommand::Shutdown).await
    }

    async fn send(&self, command: PipelineCommand) -> Result<()> {
        self.inner
            .command_tx
            .send(command)
            .await
            .map_err(|_| SearchError::PipelineClosed)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MatchUpdate> {
        self.inner.update_tx.subscribe()
    }

    /// Latest published update
    #[must_use]
    pub fn current(&self) -> MatchUpdate {
        self.inner.current_tx.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<MatchUpdate> {
        self.inner.current_tx.subscribe()
    }

    #[must_use]
    pub fn health_snapshot(&self) -> PipelineHealth {
        self.inner.health_tx.borrow().clone()
    }

    #[must_use]
    pub fn health_stream(&self) -> watch::Receiver<PipelineHealth> {
        self.inner.health_tx.subscribe()
    }

    /// Wait until no pass is pending and no semantic call is in flight.
    ///
    /// Changes sent before this call are accounted for.
    pub async fn wait_idle(&self) -> Result<PipelineHealth> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(PipelineCommand::Sync(ack_tx)).await?;
        ack_rx.await.map_err(|_| SearchError::PipelineClosed)?;

        let mut health = self.health_stream();
        loop {
            let snapshot = health.borrow_and_update().clone();
            if snapshot.is_idle() {
                return Ok(snapshot);
            }
            health
                .changed()
                .await
                .map_err(|_| SearchError::PipelineClosed)?;
        }
    }
}

/// Matcher call on its own task; a panic there becomes a failed outcome.
/// Dropping the handle aborts the call.
struct SemanticCall(JoinHandle<SemanticOutcome>);

impl SemanticCall {
    async fn outcome(&mut self) -> SemanticOutcome {
        match (&mut self.0).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Semantic matcher task failed, using lexical results: {err}");
                SemanticOutcome::Failed
            }
        }
    }
}

impl Drop for SemanticCall {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct PipelineActor {
    catalog: Arc<Catalog>,
    matcher: Option<Arc<dyn SemanticMatcher>>,
    config: PipelineConfig,
    update_tx: broadcast::Sender<MatchUpdate>,
    current_tx: watch::Sender<MatchUpdate>,
    health_tx: watch::Sender<PipelineHealth>,
    debounce: DebounceState,
    health: PipelineHealth,
    in_flight: Option<JoinHandle<()>>,
}

impl PipelineActor {
    async fn run(mut self, mut command_rx: mpsc::Receiver<PipelineCommand>) {
        let (completion_tx, mut completion_rx) = mpsc::channel::<SemanticCompletion>(16);

        loop {
            let next_deadline = self.debounce.next_deadline();

            tokio::select! {
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(PipelineCommand::Update(state)) => self.record_change(state),
                        Some(PipelineCommand::Flush) => self.debounce.force_run(),
                        Some(PipelineCommand::Sync(ack)) => {
                            let _ = ack.send(());
                        }
                        Some(PipelineCommand::Shutdown) | None => break,
                    }
                }
                Some(done) = completion_rx.recv() => {
                    self.complete_semantic(done);
                }
                () = async {
                    if let Some(deadline) = next_deadline {
                        time::sleep_until(deadline).await;
                    }
                }, if next_deadline.is_some() => {
                    self.run_pass(&completion_tx);
                }
            }
        }

        self.cancel_in_flight();
        self.health.pending = false;
        self.publish_health();
        info!("Query pipeline stopped at epoch {}", self.health.epoch);
    }

    fn record_change(&mut self, state: SearchState) {
        self.health.epoch += 1;
        self.cancel_in_flight();
        self.debounce.record(state);
        self.health.pending = true;
        self.publish_health();
    }

    fn cancel_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
            debug!("Aborted semantic call superseded by epoch {}", self.health.epoch);
        }
        self.health.in_flight = false;
    }

    fn run_pass(&mut self, completion_tx: &mpsc::Sender<SemanticCompletion>) {
        let collapsed = self.debounce.pending_changes();
        let Some(state) = self.debounce.take() else {
            return;
        };
        let epoch = self.health.epoch;
        self.health.passes += 1;
        self.health.pending = false;

        let lexical = filter_lexical(&self.catalog, &state.query, state.category);
        debug!(
            "Pass {} (epoch {epoch}, {collapsed} changes): query='{}', category={}, lexical={}",
            self.health.passes,
            state.query,
            state.category,
            lexical.len()
        );

        let matcher = self
            .matcher
            .as_ref()
            .filter(|_| self.config.merge_policy.wants_semantic(&state))
            .map(Arc::clone);

        let Some(matcher) = matcher else {
            self.publish(MatchUpdate {
                epoch,
                state,
                result: lexical,
                source: ResultSource::Lexical,
                semantic: SemanticStatus::Skipped,
            });
            self.publish_health();
            return;
        };

        self.publish(MatchUpdate {
            epoch,
            state: state.clone(),
            result: lexical.clone(),
            source: ResultSource::Lexical,
            semantic: SemanticStatus::Pending,
        });

        self.health.semantic_requests += 1;
        self.health.in_flight = true;
        self.publish_health();

        let catalog = Arc::clone(&self.catalog);
        let timeout = self.config.semantic_timeout;
        let completion_tx = completion_tx.clone();
        let query = state.query.clone();
        let category = state.category;
        self.in_flight = Some(tokio::spawn(async move {
            let mut call = SemanticCall(tokio::spawn(async move {
                let candidates: Vec<_> = catalog
                    .iter()
                    .filter(|tool| category.admits(tool.category))
                    .cloned()
                    .collect();
                match_semantic(matcher.as_ref(), &query, &candidates, timeout).await
            }));
            let outcome = call.outcome().await;
            let _ = completion_tx
                .send(SemanticCompletion {
                    epoch,
                    state,
                    lexical,
                    outcome,
                })
                .await;
        }));
    }

    fn complete_semantic(&mut self, done: SemanticCompletion) {
        if done.epoch != self.health.epoch {
            self.health.stale_responses += 1;
            debug!(
                "Dropped semantic response for epoch {} (current {})",
                done.epoch, self.health.epoch
            );
            self.publish_health();
            return;
        }

        self.in_flight = None;
        self.health.in_flight = false;
        if done.outcome == SemanticOutcome::Failed {
            self.health.semantic_failures += 1;
        }

        let (result, source) = merge(&self.catalog, &done.state, done.lexical, &done.outcome);
        let semantic = match source {
            ResultSource::Semantic => SemanticStatus::Applied,
            ResultSource::Lexical => SemanticStatus::Fallback,
        };
        self.publish(MatchUpdate {
            epoch: done.epoch,
            state: done.state,
            result,
            source,
            semantic,
        });
        self.publish_health();
    }

    fn publish(&self, update: MatchUpdate) {
        let _ = self.update_tx.send(update.clone());
        self.current_tx.send_replace(update);
    }

    fn publish_health(&self) {
        self.health_tx.send_replace(self.health.clone());
    }
}
