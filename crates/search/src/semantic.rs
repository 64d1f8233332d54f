use crate::error::{Result, SearchError};
use async_trait::async_trait;
use nexus_catalog::Tool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Minimal view of a tool sent to the matching service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolProjection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl From<&Tool> for ToolProjection {
    fn from(tool: &Tool) -> Self {
        Self {
            id: tool.id.clone(),
            name: tool.name.clone(),
            description: tool.description.clone(),
            tags: tool.tags.clone(),
        }
    }
}

/// Opaque natural-language matcher.
///
/// Implementations return the ids they consider relevant. Output is
/// untrusted: callers validate ids against the catalog.
#[async_trait]
pub trait SemanticMatcher: Send + Sync {
    fn name(&self) -> &str;

    async fn match_ids(&self, query: &str, candidates: &[ToolProjection]) -> Result<Vec<String>>;
}

/// What the semantic path produced for one pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SemanticOutcome {
    #[default]
    NotRequested,
    Failed,
    Matched(Vec<String>),
}

impl SemanticOutcome {
    /// Ids worth merging, if any
    #[must_use]
    pub fn ids(&self) -> Option<&[String]> {
        match self {
            Self::Matched(ids) if !ids.is_empty() => Some(ids),
            _ => None,
        }
    }
}

/// Single fail-soft semantic call.
///
/// No retries. Errors and timeouts are logged and reported as
/// [`SemanticOutcome::Failed`] so the caller can fall back to lexical results.
pub async fn match_semantic<T>(
    matcher: &dyn SemanticMatcher,
    query: &str,
    candidates: &[T],
    timeout: Duration,
) -> SemanticOutcome
where
    T: AsRef<Tool>,
{
    let projections: Vec<ToolProjection> = candidates
        .iter()
        .map(|tool| ToolProjection::from(tool.as_ref()))
        .collect();

    let call = matcher.match_ids(query, &projections);
    let outcome = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(ids)) => Ok(ids),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(SearchError::Timeout(timeout)),
    };

    match outcome {
        Ok(ids) => {
            log::debug!(
                "Semantic matcher '{}' returned {} ids for '{}'",
                matcher.name(),
                ids.len(),
                query
            );
            SemanticOutcome::Matched(ids)
        }
        Err(err) => {
            log::warn!(
                "Semantic matcher '{}' failed, using lexical results: {err}",
                matcher.name()
            );
            SemanticOutcome::Failed
        }
    }
}

/// Instruction text for a natural-language matching service
#[must_use]
pub fn build_prompt(query: &str, candidates: &[ToolProjection]) -> String {
    let tools_json = serde_json::to_string(candidates).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are an intelligent search assistant for a directory of web tools.\n\
         User Query: \"{query}\"\n\n\
         Here is the list of available tools:\n\
         {tools_json}\n\n\
         Task: Identify which tools from the list best match the user's intent.\n\
         Return ONLY a JSON object containing an array of 'matchedIds'.\n\
         If no tools strongly match, try to find loosely related ones.\n\n\
         Example Output:\n\
         {{\n  \"matchedIds\": [\"1\", \"5\"]\n}}\n"
    )
}

/// Validate a service payload of the form `{"matchedIds": ["1", "5"]}`.
///
/// A missing field means no matches. Ids are trimmed, blanks dropped and
/// duplicates removed keeping the first occurrence.
pub fn parse_matched_ids(text: &str) -> Result<Vec<String>> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|err| SearchError::malformed(format!("invalid JSON: {err}")))?;
    let Value::Object(map) = value else {
        return Err(SearchError::malformed("expected a JSON object"));
    };

    let raw_ids = match map.get("matchedIds") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(SearchError::malformed("'matchedIds' must be an array")),
    };

    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(raw_ids.len());
    for item in raw_ids {
        let Value::String(id) = item else {
            return Err(SearchError::malformed("'matchedIds' must contain strings"));
        };
        let id = id.trim();
        if !id.is_empty() && seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
