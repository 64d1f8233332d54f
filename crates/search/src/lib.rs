//! # Nexus Search
//!
//! Hybrid tool matching for the NexusHub directory.
//!
//! ## Architecture
//!
//! ```text
//! SearchState changes
//!     │
//!     ├──> Debounce (reschedule-and-cancel, 300ms)
//!     │
//!     ├──> Lexical filter ──────────────> published immediately
//!     │
//!     ├──> Semantic matcher (optional, async, epoch-tagged)
//!     │      └─> stale epochs dropped
//!     │
//!     └──> Merge (category facet always wins) ──> published update
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use nexus_catalog::{Catalog, SearchState};
//! use nexus_search::{build_matcher, QueryPipeline, SearchConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = SearchConfig::default();
//!     config.apply_env()?;
//!
//!     let catalog = Arc::new(Catalog::builtin()?);
//!     let matcher = build_matcher(&config.semantic)?;
//!     let pipeline = QueryPipeline::start(catalog, matcher, config.pipeline_config());
//!
//!     pipeline.update(SearchState::query("proto")).await?;
//!     pipeline.flush().await?;
//!     pipeline.wait_idle().await?;
//!
//!     for tool in pipeline.current().result.iter() {
//!         println!("{} - {}", tool.name, tool.url);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod debounce;
mod error;
mod gemini;
mod lexical;
mod merge;
mod pipeline;
mod semantic;
mod session;
mod stub;

pub use config::{build_matcher, PipelineSection, SearchConfig, SemanticConfig, SemanticMode};
pub use debounce::{DebounceState, DEFAULT_DEBOUNCE};
pub use error::{Result, SearchError};
pub use gemini::{GeminiMatcher, DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
pub use lexical::{filter_lexical, fold_query};
pub use merge::{merge, MergePolicy, ResultSource};
pub use pipeline::{
    MatchUpdate, PipelineConfig, PipelineHealth, QueryPipeline, SemanticStatus,
    DEFAULT_SEMANTIC_TIMEOUT,
};
pub use semantic::{
    build_prompt, match_semantic, parse_matched_ids, SemanticMatcher, SemanticOutcome,
    ToolProjection,
};
pub use session::BrowseSession;
pub use stub::StubMatcher;

// Re-export catalog types for convenience
pub use nexus_catalog::{Catalog, Category, CategoryFilter, MatchResult, SearchState, Tool};
