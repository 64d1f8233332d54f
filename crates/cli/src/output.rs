use anyhow::Result;
use nexus_catalog::{MatchResult, SearchState};
use nexus_search::{MatchUpdate, PipelineHealth, ResultSource, SemanticStatus};
use serde::Serialize;
use std::io;

pub fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string_pretty(value)?)
}

/// One compact JSON document per line
pub fn print_json_line<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string(value)?)
}

pub fn print_tools(tools: &MatchResult) -> Result<()> {
    for (i, tool) in tools.iter().enumerate() {
        let marker = if tool.featured { " *" } else { "" };
        print_stdout(&format!(
            "{}. {}{} [{}] {}",
            i + 1,
            tool.name,
            marker,
            tool.category,
            tool.url
        ))?;
        print_stdout(&format!("   {}", tool.description))?;
        if !tool.tags.is_empty() {
            print_stdout(&format!("   Tags: {}", tool.tags.join(", ")))?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
pub struct SearchReport<'a> {
    #[serde(flatten)]
    pub state: &'a SearchState,
    pub source: ResultSource,
    pub semantic: SemanticStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matcher: Option<&'a str>,
    pub tools: &'a MatchResult,
}

impl SearchReport<'_> {
    pub fn print(&self) -> Result<()> {
        if self.tools.is_empty() {
            return print_stdout(&format!(
                "No tools found matching \"{}\" in {}.",
                self.state.query, self.state.category
            ));
        }
        print_tools(self.tools)?;
        print_stdout("")?;
        print_stdout(&format!(
            "{} tools ({}, semantic: {})",
            self.tools.len(),
            source_label(self.source),
            semantic_label(self.semantic)
        ))
    }
}

pub fn print_update(update: &MatchUpdate) -> Result<()> {
    let names: Vec<&str> = update.result.iter().map(|tool| tool.name.as_str()).collect();
    print_stdout(&format!(
        "[epoch {}] \"{}\" in {} -> {} {}/{}: {}",
        update.epoch,
        update.state.query,
        update.state.category,
        names.len(),
        source_label(update.source),
        semantic_label(update.semantic),
        if names.is_empty() {
            "-".to_string()
        } else {
            names.join(", ")
        }
    ))
}

pub fn print_health(health: &PipelineHealth) -> Result<()> {
    print_stdout(&format!(
        "Health: epoch={} passes={} semantic_requests={} semantic_failures={} stale_responses={}",
        health.epoch,
        health.passes,
        health.semantic_requests,
        health.semantic_failures,
        health.stale_responses
    ))
}

const fn source_label(source: ResultSource) -> &'static str {
    match source {
        ResultSource::Lexical => "lexical",
        ResultSource::Semantic => "semantic",
    }
}

const fn semantic_label(status: SemanticStatus) -> &'static str {
    match status {
        SemanticStatus::Skipped => "skipped",
        SemanticStatus::Pending => "pending",
        SemanticStatus::Applied => "applied",
        SemanticStatus::Fallback => "fallback",
    }
}
