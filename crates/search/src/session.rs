use crate::error::{Result, SearchError};
use crate::pipeline::{MatchUpdate, PipelineConfig, PipelineHealth, QueryPipeline};
use crate::semantic::SemanticMatcher;
use nexus_catalog::{Catalog, CategoryFilter, SearchState, Tool};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Presentation-side browsing state.
///
/// Owns the current search input, the selected tool and the pipeline
/// handle, so front-ends pass one controller around instead of sharing
/// globals. The selection survives filtering: hiding a tool from the
/// result does not deselect it.
pub struct BrowseSession {
    catalog: Arc<Catalog>,
    pipeline: QueryPipeline,
    state: SearchState,
    selected: Option<Arc<Tool>>,
}

impl BrowseSession {
    /// Start a session; the first catalog tool is selected
    #[must_use]
    pub fn start(
        catalog: Arc<Catalog>,
        matcher: Option<Arc<dyn SemanticMatcher>>,
        config: PipelineConfig,
    ) -> Self {
        let selected = catalog.first().cloned();
        let pipeline = QueryPipeline::start(Arc::clone(&catalog), matcher, config);
        Self {
            catalog,
            pipeline,
            state: SearchState::default(),
            selected,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    #[must_use]
    pub fn pipeline(&self) -> &QueryPipeline {
        &self.pipeline
    }

    pub async fn set_query(&mut self, query: impl Into<String>) -> Result<()> {
        self.state.query = query.into();
        self.pipeline.update(self.state.clone()).await
    }

    pub async fn set_category(&mut self, category: CategoryFilter) -> Result<()> {
        self.state.category = category;
        self.pipeline.update(self.state.clone()).await
    }

    /// Replace query and category in one change
    pub async fn set_state(&mut self, state: SearchState) -> Result<()> {
        self.state = state;
        self.pipeline.update(self.state.clone()).await
    }

    pub fn select(&mut self, id: &str) -> Result<&Arc<Tool>> {
        let tool = self
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| SearchError::UnknownTool(id.to_string()))?;
        Ok(&*self.selected.insert(tool))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Arc<Tool>> {
        self.selected.as_ref()
    }

    /// Latest displayed result
    #[must_use]
    pub fn results(&self) -> MatchUpdate {
        self.pipeline.current()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MatchUpdate> {
        self.pipeline.subscribe()
    }

    pub async fn settle(&self) -> Result<PipelineHealth> {
        self.pipeline.wait_idle().await
    }
}
