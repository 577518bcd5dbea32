//! Title-to-id lookup for categories in a given language edition.
//!
//! The trimming pipeline only sees the [`CategoryResolver`] trait. Remote
//! lookups live outside this crate; the implementations here are offline: a
//! JSON table of pre-resolved ids, and a lookup against the graph's own names.

use crate::error::{Result, WikicatError};
use crate::graph::CategoryGraph;
use crate::models::CategoryId;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

const CATEGORY_PREFIX: &str = "Category:";

pub trait CategoryResolver {
    /// Maps a category title to its page id in `language`, or `CategoryNotFound`.
    fn resolve(&self, title: &str, language: &str) -> Result<CategoryId>;

    /// Resolves each title, skipping the ones that are not found. Any other
    /// error is returned.
    fn resolve_all(&self, titles: &[String], language: &str) -> Result<Vec<CategoryId>> {
        let mut ids = Vec::with_capacity(titles.len());
        for title in titles {
            match self.resolve(title, language) {
                Ok(id) => ids.push(id),
                Err(e @ WikicatError::CategoryNotFound { .. }) => {
                    debug!(error = %e, "Skipping unresolved category");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(ids)
    }
}

fn not_found(title: &str, language: &str) -> WikicatError {
    WikicatError::CategoryNotFound {
        title: title.to_string(),
        language: language.to_string(),
    }
}

/// Turns `Category:Hidden categories` into the page-table form `Hidden_categories`.
pub fn page_name(title: &str) -> String {
    let bare = title.strip_prefix(CATEGORY_PREFIX).unwrap_or(title).trim();
    let mut chars = bare.chars();
    let mut name = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>(),
        None => String::new(),
    };
    name.extend(chars);
    name.replace(' ', "_")
}

/// Pre-resolved ids keyed by language, then by title.
///
/// JSON shape: `{ "de": { "Category:Contents": 1234, ... }, ... }`.
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticResolver {
    languages: HashMap<String, HashMap<String, CategoryId>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, language: &str, title: &str, id: CategoryId) {
        self.languages
            .entry(language.to_string())
            .or_default()
            .insert(title.to_string(), id);
    }
}

impl CategoryResolver for StaticResolver {
    fn resolve(&self, title: &str, language: &str) -> Result<CategoryId> {
        self.languages
            .get(language)
            .and_then(|titles| titles.get(title))
            .copied()
            .ok_or_else(|| not_found(title, language))
    }
}

/// Resolves titles against the category names of one language's graph.
///
/// Titles are taken as written in that language; no translation is attempted.
pub struct NameResolver {
    language: String,
    name_to_id: FxHashMap<String, CategoryId>,
}

impl NameResolver {
    pub fn from_graph(language: &str, graph: &CategoryGraph) -> Self {
        let name_to_id = graph
            .nodes()
            .filter_map(|(id, node)| node.name.clone().map(|name| (name, id)))
            .collect();
        Self {
            language: language.to_string(),
            name_to_id,
        }
    }
}

impl CategoryResolver for NameResolver {
    fn resolve(&self, title: &str, language: &str) -> Result<CategoryId> {
        if language != self.language {
            return Err(not_found(title, language));
        }
        self.name_to_id
            .get(&page_name(title))
            .copied()
            .ok_or_else(|| not_found(title, language))
    }
}

/// Tries each resolver in order and returns the first hit.
#[derive(Default)]
pub struct ChainResolver {
    resolvers: Vec<Box<dyn CategoryResolver>>,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl CategoryResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl CategoryResolver for ChainResolver {
    fn resolve(&self, title: &str, language: &str) -> Result<CategoryId> {
        for resolver in &self.resolvers {
            if let Ok(id) = resolver.resolve(title, language) {
                return Ok(id);
            }
        }
        Err(not_found(title, language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CategoryNode;

    #[test]
    fn page_name_normalizes_title() {
        assert_eq!(page_name("Category:Hidden categories"), "Hidden_categories");
        assert_eq!(page_name("food and drink"), "Food_and_drink");
        assert_eq!(page_name("Category:"), "");
    }

    #[test]
    fn static_resolver_reads_json() {
        let resolver =
            StaticResolver::from_json(r#"{"de": {"Category:Contents": 42}}"#).unwrap();
        assert_eq!(resolver.resolve("Category:Contents", "de").unwrap(), 42);
        assert!(matches!(
            resolver.resolve("Category:Contents", "fr"),
            Err(WikicatError::CategoryNotFound { .. })
        ));
    }

    #[test]
    fn name_resolver_is_language_bound() {
        let mut graph = CategoryGraph::new();
        graph.add_node(9, CategoryNode::named("Hidden_categories", None));
        let resolver = NameResolver::from_graph("en", &graph);

        assert_eq!(resolver.resolve("Category:Hidden categories", "en").unwrap(), 9);
        assert!(resolver.resolve("Category:Hidden categories", "de").is_err());
    }

    #[test]
    fn chain_falls_through_to_next_resolver() {
        let mut first = StaticResolver::new();
        first.insert("en", "Category:Science", 1);
        let mut second = StaticResolver::new();
        second.insert("en", "Category:Law", 2);
        let chain = ChainResolver::new().with(first).with(second);

        assert_eq!(chain.resolve("Category:Science", "en").unwrap(), 1);
        assert_eq!(chain.resolve("Category:Law", "en").unwrap(), 2);
        assert!(chain.resolve("Category:Art", "en").is_err());
    }

    #[test]
    fn resolve_all_skips_missing() {
        let mut resolver = StaticResolver::new();
        resolver.insert("en", "Category:Science", 1);
        resolver.insert("en", "Category:Law", 2);
        let titles = vec![
            "Category:Science".to_string(),
            "Category:Missing".to_string(),
            "Category:Law".to_string(),
        ];
        assert_eq!(resolver.resolve_all(&titles, "en").unwrap(), vec![1, 2]);
    }

    struct BrokenResolver;

    impl CategoryResolver for BrokenResolver {
        fn resolve(&self, title: &str, _language: &str) -> Result<CategoryId> {
            if title == "Category:Science" {
                Ok(1)
            } else {
                Err(WikicatError::Io(std::io::Error::other("lookup failed")))
            }
        }
    }

    #[test]
    fn resolve_all_propagates_other_errors() {
        let titles = vec!["Category:Science".to_string(), "Category:Law".to_string()];
        assert!(matches!(
            BrokenResolver.resolve_all(&titles, "en"),
            Err(WikicatError::Io(_))
        ));
    }
}
