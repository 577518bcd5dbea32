//! End-to-end runs: locate a language's dumps, build, trim, and write every
//! artifact into its data directory.

use crate::columnar;
use crate::compression::Compression;
use crate::config::{RemovalPolicy, RootSeeds, TrimConfig};
use crate::dataset::Dataset;
use crate::graph::CategoryGraph;
use crate::index::build_from_dumps;
use crate::meta::{sha256_hex, DataDir, RunMeta, RunParams};
use crate::models::{DumpTable, Meta, SourceMeta};
use crate::resolver::{ChainResolver, NameResolver, StaticResolver};
use crate::stats::BuildStats;
use crate::tree::TreeForm;
use crate::trim::{run_pipeline, TrimReport};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

static DUMP_DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{8})").unwrap());

/// The three dump files one language is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFiles {
    pub page: PathBuf,
    pub category_links: PathBuf,
    pub category: PathBuf,
}

impl DumpFiles {
    pub fn path(&self, table: DumpTable) -> &Path {
        match table {
            DumpTable::Page => &self.page,
            DumpTable::CategoryLinks => &self.category_links,
            DumpTable::Category => &self.category,
        }
    }

    /// Finds `{lang}wiki-{date}-{table}.sql[.gz|.bz2]` in `dir`. With several
    /// dates for one table, the lexicographically greatest name wins.
    pub fn discover(dir: &Path, language: &str) -> Result<Self> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read dump directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        let find = |table: DumpTable| -> Result<PathBuf> {
            let pattern = format!(
                r"^{}wiki-[^-]+-{}\.sql(\.gz|\.bz2)?$",
                regex::escape(&language.replace('-', "_")),
                table.file_stem()
            );
            let re = Regex::new(&pattern).context("Failed to build dump file pattern")?;
            match names.iter().rev().find(|name| re.is_match(name)) {
                Some(name) => Ok(dir.join(name)),
                None => bail!(
                    "No {} dump for '{}' in: {}",
                    table.file_stem(),
                    language,
                    dir.display()
                ),
            }
        };

        Ok(Self {
            page: find(DumpTable::Page)?,
            category_links: find(DumpTable::CategoryLinks)?,
            category: find(DumpTable::Category)?,
        })
    }

    /// Dump date of every table, keyed for the dataset `meta` object.
    pub fn source_meta(&self) -> Result<Meta> {
        DumpTable::ALL
            .iter()
            .map(|&table| {
                let updated = dump_date(self.path(table))?;
                Ok((table.source_name().to_string(), SourceMeta { updated }))
            })
            .collect()
    }
}

/// The `YYYYMMDD` stamp in a dump file name, or the file's modification date.
pub fn dump_date(path: &Path) -> Result<NaiveDate> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    for caps in DUMP_DATE_REGEX.captures_iter(name) {
        if let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y%m%d") {
            return Ok(date);
        }
    }

    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to get modification time for: {}", path.display()))?;
    Ok(DateTime::<Local>::from(modified).date_naive())
}

/// Builds the unpruned graph and its dataset snapshot.
pub fn build_dataset(language: &str, files: &DumpFiles, stats: &BuildStats) -> Result<(CategoryGraph, Dataset)> {
    let graph = build_from_dumps(&files.page, &files.category_links, &files.category, stats)?;
    let meta = files.source_meta()?;
    let dataset = Dataset::from_graph(&graph, language, meta);
    Ok((graph, dataset))
}

/// Static ids from `resolver_file` (if any), then the graph's own names.
pub fn make_resolver(language: &str, graph: &CategoryGraph, resolver_file: Option<&Path>) -> Result<ChainResolver> {
    let mut chain = ChainResolver::new();
    if let Some(path) = resolver_file {
        let table = StaticResolver::from_path(path)
            .with_context(|| format!("Failed to load resolver table: {}", path.display()))?;
        chain = chain.with(table);
    }
    Ok(chain.with(NameResolver::from_graph(language, graph)))
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dumps_dir: PathBuf,
    pub dest_dir: PathBuf,
    /// Trim settings shared by every language; `language` is overwritten per run.
    pub trim: TrimConfig,
    pub resolver_file: Option<PathBuf>,
    pub columnar: Option<Compression>,
    pub force: bool,
}

impl RunOptions {
    /// Everything the outputs depend on besides the dumps. Reads the resolver
    /// table, if any, to fingerprint its contents.
    pub fn params(&self) -> Result<RunParams> {
        let resolver_sha256 = match &self.resolver_file {
            Some(path) => {
                let bytes = fs::read(path)
                    .with_context(|| format!("Failed to read resolver table: {}", path.display()))?;
                Some(sha256_hex(&bytes))
            }
            None => None,
        };

        Ok(RunParams {
            pages_percentile: self.trim.pages_percentile,
            max_depth: self.trim.max_depth,
            keep_hidden: self.trim.keep_hidden,
            reconnect: self.trim.removal_policy == RemovalPolicy::Reconnect,
            contents_root: matches!(self.trim.root_seeds, RootSeeds::Contents(_)),
            root_seeds: self.trim.root_seeds.titles(),
            excluded_branches: self.trim.excluded_branch_titles.clone(),
            hidden_title: self.trim.hidden_title.clone(),
            resolver_sha256,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped,
    Updated(TrimReport),
}

/// Runs one language end to end. Skips the work if `meta.json` says the outputs are current.
pub fn run_language(language: &str, opts: &RunOptions) -> Result<RunOutcome> {
    let files = DumpFiles::discover(&opts.dumps_dir, language)?;
    let sources = files.source_meta()?;
    let params = opts.params()?;
    let data_dir = DataDir::new(&opts.dest_dir, language);

    if !opts.force && data_dir.current_meta(&sources, &params).is_some() {
        return Ok(RunOutcome::Skipped);
    }
    data_dir.ensure_exists()?;

    let stats = BuildStats::new();
    let (mut graph, dataset) = build_dataset(language, &files, &stats)?;
    let dataset_json = dataset.to_json_bytes()?;
    let dataset_path = data_dir.dataset_path();
    dataset
        .write(&dataset_path)
        .with_context(|| format!("Failed to write dataset: {}", dataset_path.display()))?;
    info!(language, "Dataset written to: {}", dataset_path.display());

    let resolver = make_resolver(language, &graph, opts.resolver_file.as_deref())?;
    let config = TrimConfig {
        language: language.to_string(),
        ..opts.trim.clone()
    };
    let report = run_pipeline(&mut graph, &config, &resolver)
        .with_context(|| format!("Failed to trim category tree for '{}'", language))?;

    let tree_path = data_dir.tree_path();
    TreeForm::from_graph(&graph, language)?
        .write(&tree_path)
        .with_context(|| format!("Failed to write tree: {}", tree_path.display()))?;
    info!(language, "Tree written to: {}", tree_path.display());

    if let Some(compression) = opts.columnar {
        let dir = data_dir.columnar_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        columnar::write_columnar(&graph, &dir, compression)?;
    }

    RunMeta::new(sources, params, &dataset_json).write(&data_dir.meta_path())?;

    Ok(RunOutcome::Updated(report))
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Runs each language in turn; a failure is logged and recorded, and the next language still runs.
pub fn run_languages(languages: &[String], opts: &RunOptions) -> RunSummary {
    let mut summary = RunSummary::default();

    for language in languages {
        let start = Instant::now();
        info!(language = %language, "Starting {}wiki", language);

        match run_language(language, opts) {
            Ok(RunOutcome::Updated(report)) => {
                info!(
                    language = %language,
                    nodes = report.nodes,
                    edges = report.edges,
                    "Updated {}wiki",
                    language
                );
                summary.updated.push(language.clone());
            }
            Ok(RunOutcome::Skipped) => {
                info!(language = %language, "Dumps unchanged, skipping");
                summary.skipped.push(language.clone());
            }
            Err(e) => {
                error!(language = %language, "Run failed: {:#}", e);
                summary.failed.push((language.clone(), format!("{:#}", e)));
            }
        }

        info!(
            language = %language,
            duration_secs = start.elapsed().as_secs_f64(),
            "Finished {}wiki",
            language
        );
    }

    summary
}
