//! Per-language output directory and the `meta.json` that records what it was built from.
//!
//! A language is rebuilt only when one of its dump dates or the trim parameters
//! changed since the last successful run.

use crate::dataset::write_json;
use crate::models::{DumpTable, Meta};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Trim parameters a run's outputs depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParams {
    pub pages_percentile: u8,
    pub max_depth: Option<u32>,
    pub keep_hidden: bool,
    pub reconnect: bool,
    /// True when the root hangs off a single "Contents" category.
    pub contents_root: bool,
    pub root_seeds: Vec<String>,
    pub excluded_branches: Vec<String>,
    pub hidden_title: String,
    /// Digest of the pre-resolved id table, if one was given.
    pub resolver_sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    /// Dump dates, keyed by [`DumpTable::source_name`].
    #[serde(flatten)]
    pub sources: Meta,
    pub params: RunParams,
    /// Hex digest of the uncompressed dataset JSON.
    pub uncompressed_sha256: String,
    pub updated: NaiveDate,
    pub finished_at: DateTime<Utc>,
}

impl RunMeta {
    pub fn new(sources: Meta, params: RunParams, dataset_json: &[u8]) -> Self {
        let finished_at = Utc::now();
        Self {
            sources,
            params,
            uncompressed_sha256: sha256_hex(dataset_json),
            updated: finished_at.date_naive(),
            finished_at,
        }
    }

    /// True when every dump table has the same date as `sources` and the parameters match.
    pub fn is_current(&self, sources: &Meta, params: &RunParams) -> bool {
        if &self.params != params {
            debug!(cached = ?self.params, current = ?params, "Run parameters changed");
            return false;
        }
        DumpTable::ALL.iter().all(|table| {
            let key = table.source_name();
            let same = matches!(
                (self.sources.get(key), sources.get(key)),
                (Some(cached), Some(current)) if cached == current
            );
            if !same {
                debug!(table = key, "Dump date changed");
            }
            same
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create meta file: {}", path.display()))?;
        write_json(file, self).with_context(|| format!("Failed to write meta file: {}", path.display()))?;
        Ok(())
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Loads `meta.json`; a missing or unreadable file means "no previous run".
pub fn load_if_valid(path: &Path) -> Option<RunMeta> {
    if !path.exists() {
        debug!("No meta file at: {}", path.display());
        return None;
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "Meta file is unreadable: {}", path.display());
            return None;
        }
    };

    match serde_json::from_reader(BufReader::new(file)) {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!(error = %e, "Meta file is corrupt, rebuilding: {}", path.display());
            None
        }
    }
}

/// `{root}/{language}/` and the artifact names inside it.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    language: String,
}

impl DataDir {
    pub fn new(root: &Path, language: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            language: language.to_string(),
        }
    }

    pub fn language_dir(&self) -> PathBuf {
        self.root.join(&self.language)
    }

    pub fn ensure_exists(&self) -> Result<()> {
        let dir = self.language_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))
    }

    /// Full extract, gzip-compressed.
    pub fn dataset_path(&self) -> PathBuf {
        self.language_dir()
            .join(format!("{}_category_tree.full.json.gz", self.language))
    }

    pub fn tree_path(&self) -> PathBuf {
        self.language_dir()
            .join(format!("{}_trimmed_category_tree.json", self.language))
    }

    pub fn columnar_dir(&self) -> PathBuf {
        self.language_dir().join("columnar")
    }

    pub fn meta_path(&self) -> PathBuf {
        self.language_dir().join("meta.json")
    }

    /// Previous run's metadata, if it is still valid for these inputs.
    pub fn current_meta(&self, sources: &Meta, params: &RunParams) -> Option<RunMeta> {
        let meta = load_if_valid(&self.meta_path())?;
        if meta.is_current(sources, params) {
            info!(language = %self.language, updated = %meta.updated, "Outputs are up to date");
            Some(meta)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceMeta;
    use tempfile::TempDir;

    fn sources(day: u32) -> Meta {
        DumpTable::ALL
            .iter()
            .map(|t| {
                (
                    t.source_name().to_string(),
                    SourceMeta {
                        updated: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                    },
                )
            })
            .collect()
    }

    fn params() -> RunParams {
        RunParams {
            pages_percentile: 65,
            max_depth: Some(100),
            keep_hidden: false,
            reconnect: false,
            contents_root: false,
            root_seeds: vec!["Category:Science".to_string()],
            excluded_branches: vec!["Category:Tracking categories".to_string()],
            hidden_title: "Category:Hidden categories".to_string(),
            resolver_sha256: None,
        }
    }

    #[test]
    fn sha256_is_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn current_only_when_dates_and_params_match() {
        let meta = RunMeta::new(sources(1), params(), b"{}");
        assert!(meta.is_current(&sources(1), &params()));
        assert!(!meta.is_current(&sources(2), &params()));

        let mut other = params();
        other.pages_percentile = 50;
        assert!(!meta.is_current(&sources(1), &other));

        let mut other = params();
        other.contents_root = true;
        assert!(!meta.is_current(&sources(1), &other));

        let mut other = params();
        other.excluded_branches.clear();
        assert!(!meta.is_current(&sources(1), &other));

        let mut other = params();
        other.resolver_sha256 = Some(sha256_hex(b"{}"));
        assert!(!meta.is_current(&sources(1), &other));

        let mut partial = sources(1);
        partial.remove("category");
        assert!(!meta.is_current(&partial, &params()));
    }

    #[test]
    fn meta_file_is_flat_json() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("meta.json");
        let meta = RunMeta::new(sources(1), params(), b"{}");
        meta.write(&path)?;

        let json = fs::read_to_string(&path)?;
        assert!(json.contains("\"pagetable\": {"));
        assert!(json.contains("\"uncompressed_sha256\""));

        assert_eq!(load_if_valid(&path), Some(meta));
        Ok(())
    }

    #[test]
    fn missing_or_corrupt_meta_is_ignored() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("meta.json");
        assert!(load_if_valid(&path).is_none());

        fs::write(&path, "{ not json")?;
        assert!(load_if_valid(&path).is_none());
        Ok(())
    }

    #[test]
    fn data_dir_layout() -> Result<()> {
        let root = TempDir::new()?;
        let data_dir = DataDir::new(root.path(), "de");
        data_dir.ensure_exists()?;

        assert!(root.path().join("de").is_dir());
        assert!(data_dir.dataset_path().ends_with("de/de_category_tree.full.json.gz"));
        assert!(data_dir.tree_path().ends_with("de/de_trimmed_category_tree.json"));
        assert!(data_dir.meta_path().ends_with("de/meta.json"));

        assert!(data_dir.current_meta(&sources(1), &params()).is_none());
        RunMeta::new(sources(1), params(), b"{}").write(&data_dir.meta_path())?;
        assert!(data_dir.current_meta(&sources(1), &params()).is_some());
        Ok(())
    }
}
