use crate::error::{CatalogError, Result};
use crate::types::{Category, Tool};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

const BUILTIN_TOOLS: &str = include_str!("../data/tools.json");

/// A catalog tool together with its case-folded search text.
///
/// Folding happens once at load time so filtering never re-allocates
/// the haystacks.
#[derive(Debug)]
pub struct CatalogEntry {
    tool: Arc<Tool>,
    name: String,
    description: String,
    tags: Vec<String>,
}

impl CatalogEntry {
    fn new(tool: Tool) -> Self {
        let name = tool.name.to_lowercase();
        let description = tool.description.to_lowercase();
        let tags = tool.tags.iter().map(|tag| tag.to_lowercase()).collect();
        Self {
            tool: Arc::new(tool),
            name,
            description,
            tags,
        }
    }

    #[must_use]
    pub fn tool(&self) -> &Arc<Tool> {
        &self.tool
    }

    #[must_use]
    pub fn folded_name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn folded_description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn folded_tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether an already case-folded needle occurs in the name, description or any tag
    #[must_use]
    pub fn contains_folded(&self, needle: &str) -> bool {
        self.name.contains(needle)
            || self.description.contains(needle)
            || self.tags.iter().any(|tag| tag.contains(needle))
    }
}

/// Immutable, validated list of tools.
///
/// Built once at startup and shared read-only (usually behind an `Arc`).
#[derive(Debug)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Validate and index `tools`, keeping their order
    pub fn new(tools: Vec<Tool>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(tools.len());
        let mut entries = Vec::with_capacity(tools.len());

        for (idx, tool) in tools.into_iter().enumerate() {
            if tool.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(idx));
            }
            if tool.name.trim().is_empty() {
                return Err(CatalogError::EmptyName(tool.id));
            }
            if by_id.insert(tool.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateId(tool.id));
            }
            entries.push(CatalogEntry::new(tool));
        }

        log::debug!("Catalog built with {} tools", entries.len());
        Ok(Self { entries, by_id })
    }

    /// Parse a JSON array of tools
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let tools: Vec<Tool> = serde_json::from_str(raw)?;
        Self::new(tools)
    }

    /// Load a JSON catalog file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&raw)?;
        log::info!("Loaded {} tools from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// The directory shipped with the application
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_TOOLS)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Tool>> {
        self.entries.iter().map(CatalogEntry::tool)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<Tool>> {
        self.position(id).map(|idx| self.entries[idx].tool())
    }

    /// Catalog index of a tool id
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// The whole catalog as a result, in catalog order
    #[must_use]
    pub fn all(&self) -> MatchResult {
        MatchResult::from_tools(self.iter().cloned().collect())
    }

    #[must_use]
    pub fn first(&self) -> Option<&Arc<Tool>> {
        self.entries.first().map(CatalogEntry::tool)
    }

    /// Tools flagged for emphasis, in catalog order
    #[must_use]
    pub fn featured(&self) -> MatchResult {
        MatchResult::from_tools(self.iter().filter(|tool| tool.featured).cloned().collect())
    }
}

/// Ordered set of catalog tools satisfying the active filters.
///
/// Holds shared handles into the catalog, never copies of tool data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MatchResult {
    tools: Vec<Arc<Tool>>,
}

impl MatchResult {
    /// Caller guarantees catalog order and unique ids
    #[must_use]
    pub fn from_tools(tools: Vec<Arc<Tool>>) -> Self {
        Self { tools }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Tool>> {
        self.tools.iter()
    }

    #[must_use]
    pub fn tools(&self) -> &[Arc<Tool>] {
        &self.tools
    }

    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.id.as_str()).collect()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.tools.iter().any(|tool| tool.id == id)
    }
}

impl<'a> IntoIterator for &'a MatchResult {
    type Item = &'a Arc<Tool>;
    type IntoIter = std::slice::Iter<'a, Arc<Tool>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.iter()
    }
}

/// Tools of one category inside a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub category: Category,
    pub tools: Vec<Arc<Tool>>,
}

/// Group a result by category.
///
/// Groups are sorted alphabetically by label; tools keep result order.
/// Categories without tools are omitted.
#[must_use]
pub fn group_by_category(result: &MatchResult) -> Vec<CategoryGroup> {
    let mut groups: BTreeMap<&'static str, CategoryGroup> = BTreeMap::new();
    for tool in result {
        groups
            .entry(tool.category.label())
            .or_insert_with(|| CategoryGroup {
                category: tool.category,
                tools: Vec::new(),
            })
            .tools
            .push(Arc::clone(tool));
    }
    groups.into_values().collect()
}
