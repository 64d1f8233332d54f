use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of categories a tool can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Design,
    Development,
    Productivity,
    #[serde(rename = "Artificial Intelligence", alias = "AI")]
    ArtificialIntelligence,
    Marketing,
    Utilities,
}

impl Category {
    pub const ALL: [Self; 6] = [
        Self::Design,
        Self::Development,
        Self::Productivity,
        Self::ArtificialIntelligence,
        Self::Marketing,
        Self::Utilities,
    ];

    /// Display label, also the serialized form
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Design => "Design",
            Self::Development => "Development",
            Self::Productivity => "Productivity",
            Self::ArtificialIntelligence => "Artificial Intelligence",
            Self::Marketing => "Marketing",
            Self::Utilities => "Utilities",
        }
    }

    /// Short slug used on command lines and in config
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Development => "development",
            Self::Productivity => "productivity",
            Self::ArtificialIntelligence => "ai",
            Self::Marketing => "marketing",
            Self::Utilities => "utilities",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    /// Accepts the label or the slug, case-insensitively.
    /// Spaces, dashes and underscores are interchangeable.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | '_' => ' ',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        Self::ALL
            .into_iter()
            .find(|category| {
                category.label().eq_ignore_ascii_case(&normalized) || category.slug() == normalized
            })
            .ok_or_else(|| CatalogError::UnknownCategory(raw.trim().to_string()))
    }
}

/// Category facet used for filtering.
///
/// `All` is a UI sentinel and is never stored on a [`Tool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub const ALL_LABEL: &'static str = "All";

    /// Whether a tool in `category` passes this facet
    #[must_use]
    pub fn admits(self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(selected) => selected == category,
        }
    }

    #[must_use]
    pub const fn is_all(self) -> bool {
        matches!(self, Self::All)
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        Self::Only(category)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(Self::ALL_LABEL),
            Self::Only(category) => f.write_str(category.label()),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = CatalogError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().eq_ignore_ascii_case(Self::ALL_LABEL) {
            return Ok(Self::All);
        }
        raw.parse().map(Self::Only)
    }
}

impl TryFrom<String> for CategoryFilter {
    type Error = CatalogError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.to_string()
    }
}

/// A curated external web tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tool {
    /// Stable identifier, unique within a catalog
    pub id: String,

    pub name: String,

    /// Display text, also searchable
    pub description: String,

    /// Target resource
    pub url: String,

    pub category: Category,

    /// Short searchable labels, in display order
    #[serde(default)]
    pub tags: Vec<String>,

    /// Reference to a visual asset
    #[serde(default)]
    pub icon: String,

    /// UI emphasis hint
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub featured: bool,
}

impl Tool {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            url: url.into(),
            category,
            tags: Vec::new(),
            icon: String::new(),
            featured: false,
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    #[must_use]
    pub const fn featured(mut self, featured: bool) -> Self {
        self.featured = featured;
        self
    }
}

/// Snapshot of the user's search input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    /// Raw user text, may be empty
    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub category: CategoryFilter,
}

impl SearchState {
    #[must_use]
    pub fn new(query: impl Into<String>, category: CategoryFilter) -> Self {
        Self {
            query: query.into(),
            category,
        }
    }

    #[must_use]
    pub fn query(query: impl Into<String>) -> Self {
        Self::new(query, CategoryFilter::All)
    }

    /// True when the trimmed query is empty
    #[must_use]
    pub fn has_blank_query(&self) -> bool {
        self.query.trim().is_empty()
    }
}
