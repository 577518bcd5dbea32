//! Dataset form: the full, unpruned extract of one language edition plus the
//! dump dates it was built from.
//!
//! ```json
//! {
//!  "language": "en",
//!  "meta": { "category": { "updated": "2024-01-01" }, ... },
//!  "id_to_name": { "7": "Science", ... },
//!  "id_to_page_count": { "7": 12, ... },
//!  "edges": [[7, 100], ...]
//! }
//! ```

use crate::compression::Compression;
use crate::error::{Result, WikicatError};
use crate::graph::{CategoryGraph, CategoryNode};
use crate::models::{CategoryId, Meta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufReader, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub language: String,
    pub meta: Meta,
    pub id_to_name: BTreeMap<CategoryId, String>,
    pub id_to_page_count: BTreeMap<CategoryId, i64>,
    pub edges: Vec<(CategoryId, CategoryId)>,
}

impl Dataset {
    /// Snapshot of `graph`. Edges are sorted so equal graphs encode identically.
    pub fn from_graph(graph: &CategoryGraph, language: &str, meta: Meta) -> Self {
        let mut id_to_name = BTreeMap::new();
        let mut id_to_page_count = BTreeMap::new();
        for (id, node) in graph.nodes() {
            if let Some(name) = &node.name {
                id_to_name.insert(id, name.clone());
            }
            if let Some(count) = node.page_count {
                id_to_page_count.insert(id, count);
            }
        }

        let mut edges: Vec<_> = graph.edges().collect();
        edges.sort_unstable();

        Self {
            language: language.to_string(),
            meta,
            id_to_name,
            id_to_page_count,
            edges,
        }
    }

    /// Rebuilds the graph. Every id that appears anywhere (names, counts, edge
    /// endpoints) becomes a node, named or not.
    pub fn to_graph(&self) -> CategoryGraph {
        let mut graph = CategoryGraph::with_capacity(self.id_to_name.len());

        for (&id, name) in &self.id_to_name {
            graph.add_node(id, CategoryNode::named(name.clone(), None));
        }
        for (&id, &count) in &self.id_to_page_count {
            if !graph.set_page_count(id, count) {
                graph.add_node(
                    id,
                    CategoryNode {
                        name: None,
                        page_count: Some(count),
                    },
                );
            }
        }
        for &(parent, child) in &self.edges {
            for id in [parent, child] {
                if !graph.contains(id) {
                    graph.add_node(id, CategoryNode::default());
                }
            }
            graph.add_edge(parent, child);
        }

        graph
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(malformed)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(malformed)
    }

    /// Reads a dataset file, decompressing `.gz` and `.bz2` by extension.
    pub fn read(path: &Path) -> Result<Self> {
        Self::from_reader(BufReader::new(Compression::open(path)?))
    }

    /// Writes JSON with one-space indentation.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        write_json(writer, self)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf)?;
        Ok(buf)
    }

    /// Writes to `path`, compressing by extension.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = Compression::create(path)?;
        self.to_writer(&mut writer)?;
        writer.finish()?;
        Ok(())
    }
}

/// I/O failures stay I/O errors; anything else means the document is malformed.
pub(crate) fn malformed(e: serde_json::Error) -> WikicatError {
    if e.is_io() {
        WikicatError::Io(e.into())
    } else {
        WikicatError::MalformedPersistedState(e.to_string())
    }
}

pub(crate) fn write_json<W: Write, T: Serialize>(writer: W, value: &T) -> Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut serializer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceMeta;
    use chrono::NaiveDate;

    fn meta() -> Meta {
        let mut meta = Meta::new();
        meta.insert(
            "category".to_string(),
            SourceMeta {
                updated: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            },
        );
        meta
    }

    fn sample_graph(edges: &[(CategoryId, CategoryId)]) -> CategoryGraph {
        let mut g = CategoryGraph::new();
        g.add_node(7, CategoryNode::named("Science", Some(12)));
        g.add_node(100, CategoryNode::named("Physics", Some(9)));
        g.add_node(101, CategoryNode::named("Optics", None));
        g.add_node(55, CategoryNode::default());
        for &(p, c) in edges {
            g.add_edge(p, c);
        }
        g
    }

    #[test]
    fn round_trip_ignores_edge_order() {
        let a = sample_graph(&[(7, 100), (100, 101), (7, 55)]);
        let b = sample_graph(&[(7, 55), (100, 101), (7, 100)]);

        let da = Dataset::from_graph(&a, "en", meta());
        let db = Dataset::from_graph(&b, "en", meta());
        assert_eq!(da, db);

        let decoded = Dataset::from_graph(&da.to_graph(), "en", meta());
        assert_eq!(decoded, da);
        assert_eq!(da.to_graph().name(55), None);
    }

    #[test]
    fn json_uses_string_keys_and_iso_dates() {
        let ds = Dataset::from_graph(&sample_graph(&[(7, 100)]), "en", meta());
        let mut buf = Vec::new();
        ds.to_writer(&mut buf).unwrap();
        let json = String::from_utf8(buf).unwrap();

        assert!(json.contains("\"7\": \"Science\""));
        assert!(json.contains("\"updated\": \"2024-01-01\""));
        assert!(json.contains("\n \"language\""));

        assert_eq!(Dataset::from_json(&json).unwrap(), ds);
    }

    #[test]
    fn decodes_handwritten_document() {
        let json = r#"{
 "language": "de",
 "meta": {"pagetable": {"updated": "2023-05-20"}},
 "id_to_name": {"1": "Wissenschaft", "2": "Physik"},
 "id_to_page_count": {"1": 4, "3": 2},
 "edges": [[1, 2], [2, 4]]
}"#;
        let graph = Dataset::from_json(json).unwrap().to_graph();

        assert_eq!(graph.node_count(), 4);
        assert!(graph.has_edge(1, 2));
        assert!(graph.has_edge(2, 4));
        assert_eq!(graph.page_count(1), Some(4));
        assert_eq!(graph.page_count(3), Some(2));
        assert_eq!(graph.name(3), None);
    }

    #[test]
    fn missing_field_is_malformed() {
        let json = r#"{"language": "en", "meta": {}, "id_to_name": {}, "edges": []}"#;
        assert!(matches!(
            Dataset::from_json(json),
            Err(WikicatError::MalformedPersistedState(_))
        ));
    }

    #[test]
    fn non_integer_key_is_malformed() {
        let json = r#"{"language": "en", "meta": {}, "id_to_name": {"x": "A"},
                       "id_to_page_count": {}, "edges": []}"#;
        assert!(matches!(
            Dataset::from_json(json),
            Err(WikicatError::MalformedPersistedState(_))
        ));
    }

    #[test]
    fn write_and_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let ds = Dataset::from_graph(&sample_graph(&[(7, 100)]), "en", meta());

        for name in ["en.json", "en.json.gz"] {
            let path = dir.path().join(name);
            ds.write(&path).unwrap();
            assert_eq!(Dataset::read(&path).unwrap(), ds);
        }
    }
}
