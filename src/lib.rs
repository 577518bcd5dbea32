//! Wikicat: Wikipedia category hierarchies from MediaWiki SQL dumps
//!
//! This crate builds a directed category graph for one language edition and
//! prunes it down to a navigable tree:
//!
//! 1. **Extraction** -- Stream the `page`, `categorylinks` and `category` dump
//!    tables line by line, scanning each `INSERT` line for row tuples
//! 2. **Graph Build** -- Resolve category names to page ids, keep `subcat`
//!    memberships as parent -> child edges, attach page counts
//! 3. **Trimming** -- Add a synthetic root over the main topic categories, then
//!    drop hidden and administrative branches, rarely used categories, unnamed
//!    ids and everything too deep below the root
//! 4. **Serialization** -- Write the unpruned dataset, the trimmed tree and
//!    optional CSV tables
//!
//! # Architecture
//!
//! - **Streaming extraction** -- Dump lines are pulled lazily through gzip/bzip2
//!   decoders; only the resolved graph is held in memory
//! - **Owned adjacency** -- [`graph::CategoryGraph`] keeps forward and reverse
//!   indices so reconnecting removals cost O(degree)
//! - **Deterministic traversal** -- Adjacency sets are ordered, so depth trims
//!   are reproducible
//! - **Resumable runs** -- `meta.json` records dump dates and parameters; an
//!   unchanged language is skipped
//!
//! # Key Modules
//!
//! - [`parser`] -- Tuple scanner and record readers for SQL dump lines
//! - [`index`] -- Name/id index and graph construction
//! - [`graph`] -- Category graph with depth-limited DFS
//! - [`trim`] -- Trimming passes and the pipeline runner
//! - [`resolver`] -- Title to id lookup for seeds, hidden and excluded categories
//! - [`dataset`], [`tree`], [`columnar`] -- Persisted forms
//! - [`meta`] -- Output layout and skip-if-unchanged metadata
//! - [`run`] -- Per-language orchestration with failure isolation
//! - [`stats`] -- Counters for extraction metrics
//! - [`config`] -- Constants and trim options
//!
//! # Example Usage
//!
//! ```bash
//! # Build the unpruned dataset for one language
//! wikicat build --language en --page enwiki-20240201-page.sql.gz \
//!     --category-links enwiki-20240201-categorylinks.sql.gz \
//!     --category enwiki-20240201-category.sql.gz -o en.json.gz
//!
//! # Trim it into a tree
//! wikicat trim -i en.json.gz -o en_tree.json --pages-percentile 65 --max-depth 100
//!
//! # Or do everything for several languages
//! wikicat run --dumps dumps/ --dest data/ --languages en de fr
//! ```

pub mod columnar;
pub mod compression;
pub mod config;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod index;
pub mod meta;
pub mod models;
pub mod parser;
pub mod resolver;
pub mod run;
pub mod stats;
pub mod tree;
pub mod trim;

pub use error::{Result, WikicatError};
