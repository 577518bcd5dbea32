//! Columnar form: `categories.csv` (`id,name,page_count`) and `edges.csv`
//! (`parent_id,child_id`), optionally gzip- or bzip2-compressed.
//!
//! Missing names and page counts are written as empty fields.

use crate::compression::{CompressedWriter, Compression};
use crate::error::{Result, WikicatError};
use crate::graph::{CategoryGraph, CategoryNode};
use crate::models::CategoryId;
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CATEGORIES_TABLE: &str = "categories";
pub const EDGES_TABLE: &str = "edges";

#[derive(Debug, Serialize, Deserialize)]
struct CategoryRow {
    id: CategoryId,
    name: Option<String>,
    page_count: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeRow {
    parent_id: CategoryId,
    child_id: CategoryId,
}

pub fn table_path(dir: &Path, table: &str, compression: Compression) -> PathBuf {
    dir.join(format!("{}.csv{}", table, compression.suffix()))
}

/// Writes both tables into `dir`, rows sorted by id. Returns the paths written.
pub fn write_columnar(graph: &CategoryGraph, dir: &Path, compression: Compression) -> Result<Vec<PathBuf>> {
    let categories_path = table_path(dir, CATEGORIES_TABLE, compression);
    let mut writer = Writer::from_writer(Compression::create(&categories_path)?);
    for id in graph.sorted_ids() {
        let node = graph.node(id).cloned().unwrap_or_default();
        writer.serialize(CategoryRow {
            id,
            name: node.name,
            page_count: node.page_count,
        })?;
    }
    finish(writer)?;

    let edges_path = table_path(dir, EDGES_TABLE, compression);
    let mut edges: Vec<_> = graph.edges().collect();
    edges.sort_unstable();
    let mut writer = Writer::from_writer(Compression::create(&edges_path)?);
    if edges.is_empty() {
        writer.write_record(["parent_id", "child_id"])?;
    }
    for (parent_id, child_id) in edges {
        writer.serialize(EdgeRow { parent_id, child_id })?;
    }
    finish(writer)?;

    info!(
        categories = graph.node_count(),
        edges = graph.edge_count(),
        "Columnar tables written to: {}",
        dir.display()
    );
    Ok(vec![categories_path, edges_path])
}

fn finish(writer: Writer<CompressedWriter>) -> Result<()> {
    let inner = writer
        .into_inner()
        .map_err(|e| WikicatError::Io(e.into_error()))?;
    inner.finish()?;
    Ok(())
}

/// Reads both tables back. An edge whose endpoint is not in `categories` is malformed.
pub fn read_columnar(dir: &Path, compression: Compression) -> Result<CategoryGraph> {
    let mut graph = CategoryGraph::new();

    let categories_path = table_path(dir, CATEGORIES_TABLE, compression);
    let mut reader = Reader::from_reader(Compression::open(&categories_path)?);
    for row in reader.deserialize() {
        let row: CategoryRow = row.map_err(malformed)?;
        graph.add_node(
            row.id,
            CategoryNode {
                name: row.name,
                page_count: row.page_count,
            },
        );
    }

    let edges_path = table_path(dir, EDGES_TABLE, compression);
    let mut reader = Reader::from_reader(Compression::open(&edges_path)?);
    for row in reader.deserialize() {
        let row: EdgeRow = row.map_err(malformed)?;
        if !graph.contains(row.parent_id) || !graph.contains(row.child_id) {
            return Err(WikicatError::MalformedPersistedState(format!(
                "edge {} -> {} references an unknown category",
                row.parent_id, row.child_id
            )));
        }
        graph.add_edge(row.parent_id, row.child_id);
    }

    Ok(graph)
}

fn malformed(e: csv::Error) -> WikicatError {
    if e.is_io_error() {
        WikicatError::Csv(e)
    } else {
        WikicatError::MalformedPersistedState(e.to_string())
    }
}
