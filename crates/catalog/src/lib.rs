//! # Nexus Catalog
//!
//! Immutable directory of external web tools and the search data model
//! shared by the matching pipeline and its front-ends.
//!
//! ## Example
//!
//! ```
//! use nexus_catalog::{Catalog, CategoryFilter, group_by_category};
//!
//! let catalog = Catalog::builtin().expect("builtin catalog is valid");
//! let featured = catalog.featured();
//! assert!(!featured.is_empty());
//!
//! for group in group_by_category(&catalog.all()) {
//!     println!("{}: {} tools", group.category, group.tools.len());
//! }
//! # let _ = CategoryFilter::All;
//! ```

mod catalog;
mod error;
mod types;

pub use catalog::{group_by_category, Catalog, CatalogEntry, CategoryGroup, MatchResult};
pub use error::{CatalogError, Result};
pub use types::{Category, CategoryFilter, SearchState, Tool};
