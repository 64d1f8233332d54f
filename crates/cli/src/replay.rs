use crate::output::{print_health, print_json_line, print_stdout, print_tools, print_update};
use anyhow::{Context as AnyhowContext, Result};
use log::{info, warn};
use nexus_catalog::{Catalog, CategoryFilter, SearchState};
use nexus_search::{build_matcher, BrowseSession, MatchUpdate, SearchConfig};
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::time::{self, Instant};

/// One scripted input change
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayStep {
    /// Delay before the change, measured from the previous step
    #[serde(default)]
    pub after_ms: u64,

    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub category: Option<CategoryFilter>,

    /// Tool id to select
    #[serde(default)]
    pub select: Option<String>,
}

impl ReplayStep {
    /// Input after this step, or `None` when the step changes neither field
    fn apply(&self, current: &SearchState) -> Option<SearchState> {
        if self.query.is_none() && self.category.is_none() {
            return None;
        }
        Some(SearchState::new(
            self.query.clone().unwrap_or_else(|| current.query.clone()),
            self.category.unwrap_or(current.category),
        ))
    }
}

pub fn parse_script(raw: &str) -> Result<Vec<ReplayStep>> {
    serde_json::from_str(raw).context("Replay script must be a JSON array of steps")
}

pub async fn run(
    script: &Path,
    json_output: bool,
    catalog: Arc<Catalog>,
    config: &SearchConfig,
) -> Result<()> {
    let raw = fs::read_to_string(script)
        .with_context(|| format!("Failed to read replay script {}", script.display()))?;
    let steps = parse_script(&raw)?;

    let matcher = build_matcher(&config.semantic).context("Failed to configure semantic matcher")?;
    let mut session = BrowseSession::start(catalog, matcher, config.pipeline_config());
    let mut updates = session.subscribe();
    info!("Replaying {} steps from {}", steps.len(), script.display());

    for step in &steps {
        pump_for(
            &mut updates,
            Duration::from_millis(step.after_ms),
            json_output,
        )
        .await?;

        if let Some(state) = step.apply(session.state()) {
            session.set_state(state).await?;
        }
        if let Some(id) = &step.select {
            match session.select(id) {
                Ok(tool) => info!("Selected {} ({})", tool.name, tool.id),
                Err(err) => warn!("Ignoring selection: {err}"),
            }
        }
    }

    // End of input: nothing else will change, skip the remaining window
    session.pipeline().flush().await?;
    let health = session.settle().await?;
    loop {
        match updates.try_recv() {
            Ok(update) => emit_update(&update, json_output)?,
            Err(TryRecvError::Lagged(skipped)) => warn!("Skipped {skipped} updates"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    let last = session.results();
    if json_output {
        print_json_line(&json!({
            "event": "final",
            "state": session.state(),
            "tools": last.result,
            "selected": session.selected().map(|tool| tool.id.as_str()),
            "health": health,
        }))?;
    } else {
        print_stdout("")?;
        print_stdout(&format!(
            "Final: \"{}\" in {} ({} tools)",
            last.state.query,
            last.state.category,
            last.result.len()
        ))?;
        print_tools(&last.result)?;
        if let Some(tool) = session.selected() {
            print_stdout(&format!("Selected: {} ({})", tool.name, tool.url))?;
        }
        print_health(&health)?;
    }

    session.pipeline().shutdown().await?;
    Ok(())
}

/// Print updates until `wait` has elapsed
async fn pump_for(
    updates: &mut broadcast::Receiver<MatchUpdate>,
    wait: Duration,
    json_output: bool,
) -> Result<()> {
    let deadline = Instant::now() + wait;
    loop {
        tokio::select! {
            received = updates.recv() => match received {
                Ok(update) => emit_update(&update, json_output)?,
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {skipped} updates"),
                Err(RecvError::Closed) => return Ok(()),
            },
            () = time::sleep_until(deadline) => return Ok(()),
        }
    }
}

fn emit_update(update: &MatchUpdate, json_output: bool) -> Result<()> {
    if json_output {
        print_json_line(&json!({ "event": "update", "update": update }))
    } else {
        print_update(update)
    }
}
