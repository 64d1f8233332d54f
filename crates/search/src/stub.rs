use crate::error::Result;
use crate::semantic::{SemanticMatcher, ToolProjection};
use async_trait::async_trait;

const MIN_TERM_CHARS: usize = 3;

/// Deterministic offline matcher.
///
/// Splits the query into lowercase alphanumeric words of at least three
/// characters and matches candidates mentioning any of them. Used when no
/// matching service is configured.
#[derive(Debug, Clone, Default)]
pub struct StubMatcher;

impl StubMatcher {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn terms(query: &str) -> Vec<String> {
        let mut terms: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.chars().count() >= MIN_TERM_CHARS)
            .map(str::to_lowercase)
            .collect();
        terms.sort();
        terms.dedup();
        terms
    }

    fn mentions(candidate: &ToolProjection, term: &str) -> bool {
        candidate.name.to_lowercase().contains(term)
            || candidate.description.to_lowercase().contains(term)
            || candidate
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(term))
    }
}

#[async_trait]
impl SemanticMatcher for StubMatcher {
    fn name(&self) -> &str {
        "stub"
    }

    async fn match_ids(&self, query: &str, candidates: &[ToolProjection]) -> Result<Vec<String>> {
        let terms = Self::terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        Ok(candidates
            .iter()
            .filter(|candidate| terms.iter().any(|term| Self::mentions(candidate, term)))
            .map(|candidate| candidate.id.clone())
            .collect())
    }
}
