use crate::semantic::SemanticOutcome;
use nexus_catalog::{Catalog, MatchResult, SearchState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How lexical and semantic signals combine into the displayed result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Semantic matcher is never invoked
    #[default]
    LexicalOnly,
    /// Semantic ids override the lexical result when they validate
    SemanticPreferred,
}

impl MergePolicy {
    /// Whether a pass for `state` should call the semantic matcher
    #[must_use]
    pub fn wants_semantic(self, state: &SearchState) -> bool {
        matches!(self, Self::SemanticPreferred) && !state.has_blank_query()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LexicalOnly => "lexical_only",
            Self::SemanticPreferred => "semantic_preferred",
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "lexical_only" | "lexical" => Ok(Self::LexicalOnly),
            "semantic_preferred" | "semantic" => Ok(Self::SemanticPreferred),
            other => Err(format!(
                "unknown merge policy '{other}' (expected 'lexical_only' or 'semantic_preferred')"
            )),
        }
    }
}

/// Which path produced a displayed result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Lexical,
    Semantic,
}

/// Reconcile lexical and semantic results.
///
/// Semantic ids are validated against the catalog and the active category
/// facet. When at least one survives, the result is that catalog subset in
/// catalog order; otherwise the lexical result is returned unchanged.
#[must_use]
pub fn merge(
    catalog: &Catalog,
    state: &SearchState,
    lexical: MatchResult,
    outcome: &SemanticOutcome,
) -> (MatchResult, ResultSource) {
    let Some(ids) = outcome.ids() else {
        return (lexical, ResultSource::Lexical);
    };

    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let tools: Vec<_> = catalog
        .iter()
        .filter(|tool| state.category.admits(tool.category))
        .filter(|tool| wanted.contains(tool.id.as_str()))
        .map(Arc::clone)
        .collect();

    if tools.is_empty() {
        log::debug!(
            "Semantic ids {:?} did not validate against the catalog, keeping lexical results",
            ids
        );
        return (lexical, ResultSource::Lexical);
    }

    (MatchResult::from_tools(tools), ResultSource::Semantic)
}
