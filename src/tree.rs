//! Tree form: the trimmed hierarchy, one entry per category with its parents
//! and children, rooted at [`ROOT_ID`].

use crate::compression::Compression;
use crate::config::{ROOT_ID, ROOT_NAME};
use crate::dataset::{malformed, write_json};
use crate::error::{Result, WikicatError};
use crate::graph::{CategoryGraph, CategoryNode};
use crate::models::CategoryId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufReader, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i64>,
    pub parents: Vec<CategoryId>,
    pub children: Vec<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeForm {
    pub language: String,
    pub categories: BTreeMap<CategoryId, TreeEntry>,
}

impl TreeForm {
    /// Each node's neighbours are split into children (edge out of the node)
    /// and parents (edge into it). A neighbour linked both ways is listed as a child only.
    pub fn from_graph(graph: &CategoryGraph, language: &str) -> Result<Self> {
        let mut categories = BTreeMap::new();

        for (id, node) in graph.nodes() {
            let name = match (&node.name, id) {
                (_, ROOT_ID) => ROOT_NAME.to_string(),
                (Some(name), _) => name.clone(),
                (None, _) => return Err(WikicatError::UnnamedNode(id)),
            };
            let children: Vec<CategoryId> = graph.successors(id).collect();
            let parents: Vec<CategoryId> = graph
                .predecessors(id)
                .filter(|p| !graph.has_edge(id, *p))
                .collect();

            categories.insert(
                id,
                TreeEntry {
                    name,
                    page_count: node.page_count,
                    parents,
                    children,
                },
            );
        }

        Ok(Self {
            language: language.to_string(),
            categories,
        })
    }

    /// Edges are taken from both `children` and `parents`; an id listed as a
    /// neighbour but missing from `categories` is malformed.
    pub fn to_graph(&self) -> Result<CategoryGraph> {
        let mut graph = CategoryGraph::with_capacity(self.categories.len());
        for (&id, entry) in &self.categories {
            graph.add_node(id, CategoryNode::named(entry.name.clone(), entry.page_count));
        }

        let mut edges = BTreeSet::new();
        for (&id, entry) in &self.categories {
            edges.extend(entry.children.iter().map(|&child| (id, child)));
            edges.extend(entry.parents.iter().map(|&parent| (parent, id)));
        }
        for (parent, child) in edges {
            if !graph.add_edge(parent, child) {
                return Err(WikicatError::MalformedPersistedState(format!(
                    "edge {} -> {} references an unknown category",
                    parent, child
                )));
            }
        }

        Ok(graph)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(malformed)
    }

    pub fn read(path: &Path) -> Result<Self> {
        Self::from_reader(BufReader::new(Compression::open(path)?))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        write_json(writer, self)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = Compression::create(path)?;
        self.to_writer(&mut writer)?;
        writer.finish()?;
        Ok(())
    }
}
