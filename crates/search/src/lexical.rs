use nexus_catalog::{Catalog, CategoryFilter, MatchResult};
use std::sync::Arc;

/// Substring filter over name, description and tags.
///
/// Category and query are conjunctive. Pure and deterministic: output is a
/// subsequence of the catalog in catalog order. A blank query with
/// [`CategoryFilter::All`] returns the whole catalog.
#[must_use]
pub fn filter_lexical(catalog: &Catalog, query: &str, category: CategoryFilter) -> MatchResult {
    let needle = fold_query(query);

    let tools = catalog
        .entries()
        .iter()
        .filter(|entry| category.admits(entry.tool().category))
        .filter(|entry| needle.as_deref().map_or(true, |n| entry.contains_folded(n)))
        .map(|entry| Arc::clone(entry.tool()))
        .collect();

    MatchResult::from_tools(tools)
}

/// Case-folded needle, or `None` when the query is blank.
///
/// Whitespace only decides blankness; a non-blank query is matched as typed,
/// surrounding spaces included.
#[must_use]
pub fn fold_query(query: &str) -> Option<String> {
    (!query.trim().is_empty()).then(|| query.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_catalog::{Category, Tool};
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Tool::new(
                "2",
                "Figma",
                "Collaborative interface design tool.",
                "https://www.figma.com",
                Category::Design,
            )
            .with_tags(["UI/UX", "Prototyping", "Collaboration"]),
            Tool::new(
                "12",
                "Gumroad",
                "E-commerce platform for creators to sell digital products.",
                "https://gumroad.com",
                Category::Marketing,
            )
            .with_tags(["E-commerce", "Creators", "Sales"]),
            Tool::new(
                "9",
                "Excalidraw",
                "Virtual whiteboard for sketching hand-drawn like diagrams.",
                "https://excalidraw.com",
                Category::Utilities,
            )
            .with_tags(["Whiteboard", "Diagram", "Sketch"]),
        ])
        .unwrap()
    }

    #[test]
    fn blank_query_all_returns_catalog() {
        let catalog = catalog();
        assert_eq!(
            filter_lexical(&catalog, "", CategoryFilter::All),
            catalog.all()
        );
        assert_eq!(
            filter_lexical(&catalog, "   ", CategoryFilter::All),
            catalog.all()
        );
    }

    #[test]
    fn tag_substring_match() {
        let result = filter_lexical(&catalog(), "proto", CategoryFilter::All);
        assert_eq!(result.ids(), vec!["2"]);
    }

    #[test]
    fn prefix_of_name_matches() {
        let result = filter_lexical(&catalog(), "fi", CategoryFilter::All);
        assert_eq!(result.ids(), vec!["2"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let result = filter_lexical(&catalog(), "WHITEBOARD", CategoryFilter::All);
        assert_eq!(result.ids(), vec!["9"]);
    }

    #[test]
    fn description_substring_match() {
        let result = filter_lexical(&catalog(), "digital", CategoryFilter::All);
        assert_eq!(result.ids(), vec!["12"]);
    }

    #[test]
    fn surrounding_whitespace_is_part_of_the_needle() {
        let catalog = catalog();
        assert!(filter_lexical(&catalog, "figma ", CategoryFilter::All).is_empty());
        assert!(filter_lexical(&catalog, "  proto", CategoryFilter::All).is_empty());
        assert_eq!(
            filter_lexical(&catalog, "interface ", CategoryFilter::All).ids(),
            vec!["2"]
        );
        assert_eq!(fold_query(" Fig "), Some(" fig ".to_string()));
        assert_eq!(fold_query(" \t "), None);
    }

    #[test]
    fn category_and_query_are_conjunctive() {
        let catalog = catalog();
        let design = CategoryFilter::Only(Category::Design);

        assert_eq!(filter_lexical(&catalog, "", design).ids(), vec!["2"]);
        assert_eq!(filter_lexical(&catalog, "proto", design).ids(), vec!["2"]);
        assert!(filter_lexical(&catalog, "sales", design).is_empty());
    }

    #[test]
    fn category_without_tools_is_empty() {
        let result = filter_lexical(
            &catalog(),
            "",
            CategoryFilter::Only(Category::ArtificialIntelligence),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn multi_word_query_is_a_single_substring() {
        let catalog = catalog();
        assert_eq!(
            filter_lexical(&catalog, "interface design", CategoryFilter::All).ids(),
            vec!["2"]
        );
        assert!(filter_lexical(&catalog, "design interface", CategoryFilter::All).is_empty());
    }

    #[test]
    fn empty_catalog_yields_empty_result() {
        let catalog = Catalog::new(Vec::new()).unwrap();
        assert!(filter_lexical(&catalog, "anything", CategoryFilter::All).is_empty());
    }
}
