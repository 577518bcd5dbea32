use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use wikicat::compression::Compression;
use wikicat::config::{
    RemovalPolicy, RootSeeds, TrimConfig, CONTENTS_TITLE, DEFAULT_EXCLUDED_BRANCHES, DEFAULT_MAX_DEPTH,
    DEFAULT_PAGES_PERCENTILE, SOURCE_LANGUAGE,
};
use wikicat::dataset::Dataset;
use wikicat::run::{build_dataset, make_resolver, run_languages, DumpFiles, RunOptions};
use wikicat::stats::BuildStats;
use wikicat::tree::TreeForm;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "wikicat")]
#[command(about = "Build pruned Wikipedia category trees from SQL dumps")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the unpruned dataset from three dump files
    Build(BuildArgs),
    /// Trim a dataset into a category tree
    Trim(TrimArgs),
    /// Build and trim every language found in a dump directory
    Run(RunArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Language edition code (e.g. en, de)
    #[arg(short, long, default_value = SOURCE_LANGUAGE)]
    language: String,

    /// Path to the page table dump (.sql, .sql.gz, .sql.bz2)
    #[arg(long)]
    page: PathBuf,

    /// Path to the categorylinks table dump
    #[arg(long)]
    category_links: PathBuf,

    /// Path to the category table dump
    #[arg(long)]
    category: PathBuf,

    /// Output dataset path (.json, .json.gz, .json.bz2)
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args, Clone)]
struct TrimOptions {
    /// Percentile of the page-count distribution below which categories are dropped (clamped to 0-100)
    #[arg(long, default_value_t = DEFAULT_PAGES_PERCENTILE as i64, allow_negative_numbers = true)]
    pages_percentile: i64,

    /// Deepest level kept below the root
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, conflicts_with = "unbounded")]
    max_depth: u32,

    /// Keep everything reachable from the root, however deep
    #[arg(long)]
    unbounded: bool,

    /// Keep hidden categories
    #[arg(long)]
    keep_hidden: bool,

    /// Link parents to children of dropped low-count categories instead of cutting them off
    #[arg(long)]
    reconnect: bool,

    /// Use the "Contents" category as the root's only child instead of the main topics
    #[arg(long)]
    contents_root: bool,

    /// Category whose branch is removed (repeatable); replaces the built-in list
    #[arg(long = "exclude-branch", value_name = "TITLE")]
    exclude_branches: Vec<String>,

    /// JSON table of pre-resolved category ids: {"lang": {"Category:Title": id}}
    #[arg(long)]
    resolver: Option<PathBuf>,
}

impl TrimOptions {
    fn to_config(&self, language: &str) -> TrimConfig {
        TrimConfig {
            max_depth: if self.unbounded { None } else { Some(self.max_depth) },
            keep_hidden: self.keep_hidden,
            removal_policy: if self.reconnect {
                RemovalPolicy::Reconnect
            } else {
                RemovalPolicy::Drop
            },
            root_seeds: if self.contents_root {
                RootSeeds::Contents(CONTENTS_TITLE.to_string())
            } else {
                RootSeeds::default()
            },
            excluded_branch_titles: if self.exclude_branches.is_empty() {
                DEFAULT_EXCLUDED_BRANCHES.iter().map(|t| t.to_string()).collect()
            } else {
                self.exclude_branches.clone()
            },
            ..TrimConfig::new(language)
        }
        .with_percentile(self.pages_percentile)
    }
}

#[derive(Args)]
struct TrimArgs {
    /// Dataset produced by `build`
    #[arg(short, long)]
    input: PathBuf,

    /// Output tree path
    #[arg(short, long)]
    output: PathBuf,

    /// Also write categories/edges CSV tables into this directory
    #[arg(long)]
    columnar: Option<PathBuf>,

    /// Compression for the CSV tables: none, gz or bz2
    #[arg(long, default_value = "none", value_parser = parse_compression)]
    compression: Compression,

    #[command(flatten)]
    trim: TrimOptions,
}

#[derive(Args)]
struct RunArgs {
    /// Directory holding {lang}wiki-{date}-{table}.sql[.gz|.bz2] files
    #[arg(long)]
    dumps: PathBuf,

    /// Root of the per-language output directories
    #[arg(long)]
    dest: PathBuf,

    /// Languages to process, in order
    #[arg(long, num_args = 1.., default_values_t = vec![SOURCE_LANGUAGE.to_string()])]
    languages: Vec<String>,

    /// Rebuild even if meta.json says the outputs are current
    #[arg(long)]
    force: bool,

    /// Write CSV tables next to the tree, with this compression: none, gz or bz2
    #[arg(long, value_parser = parse_compression)]
    columnar: Option<Compression>,

    #[command(flatten)]
    trim: TrimOptions,
}

fn parse_compression(value: &str) -> std::result::Result<Compression, String> {
    match value {
        "none" => Ok(Compression::None),
        "gz" | "gzip" => Ok(Compression::Gzip),
        "bz2" | "bzip2" => Ok(Compression::Bzip2),
        other => Err(format!("unknown compression '{}' (expected none, gz or bz2)", other)),
    }
}

fn run_build(args: BuildArgs) -> Result<()> {
    let start = Instant::now();
    let files = DumpFiles {
        page: args.page,
        category_links: args.category_links,
        category: args.category,
    };

    let stats = BuildStats::new();
    let (_, dataset) = build_dataset(&args.language, &files, &stats)?;
    dataset
        .write(&args.output)
        .with_context(|| format!("Failed to write dataset: {}", args.output.display()))?;

    info!(
        duration_secs = start.elapsed().as_secs_f64(),
        "Build complete"
    );

    println!();
    println!("=== Summary ===");
    println!("Language:           {}", dataset.language);
    println!("Categories:         {}", dataset.id_to_name.len());
    println!("Page counts:        {}", dataset.id_to_page_count.len());
    println!("Edges:              {}", dataset.edges.len());
    println!("Lines read:         {}", stats.lines());
    println!("Tuples rejected:    {}", stats.rejected());
    println!("Unresolved links:   {}", stats.links_unresolved());
    println!("Unresolved counts:  {}", stats.categories_unresolved());
    println!("Build time:         {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

fn run_trim(args: TrimArgs) -> Result<()> {
    let start = Instant::now();
    let dataset = Dataset::read(&args.input)
        .with_context(|| format!("Failed to read dataset: {}", args.input.display()))?;
    let mut graph = dataset.to_graph();
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Dataset loaded"
    );

    let config = args.trim.to_config(&dataset.language);
    let resolver = make_resolver(&dataset.language, &graph, args.trim.resolver.as_deref())?;
    let report = wikicat::trim::run_pipeline(&mut graph, &config, &resolver)
        .context("Failed to trim category tree")?;

    TreeForm::from_graph(&graph, &dataset.language)?
        .write(&args.output)
        .with_context(|| format!("Failed to write tree: {}", args.output.display()))?;

    if let Some(dir) = &args.columnar {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        wikicat::columnar::write_columnar(&graph, dir, args.compression)?;
    }

    println!();
    println!("=== Summary ===");
    println!("Seeds attached:     {}", report.seeds_attached);
    println!("Hidden removed:     {}", report.hidden_removed);
    println!("Excluded removed:   {}", report.excluded_removed);
    println!("Page cutoff:        {}", report.cutoff);
    println!("Below cutoff:       {}", report.percentile_removed);
    println!("Unnamed removed:    {}", report.unnamed_removed);
    println!("Too deep:           {}", report.depth_removed);
    println!("Categories kept:    {}", report.nodes);
    println!("Edges kept:         {}", report.edges);
    println!("Trim time:          {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

fn run_all(args: RunArgs) -> Result<()> {
    let opts = RunOptions {
        dumps_dir: args.dumps,
        dest_dir: args.dest,
        trim: args.trim.to_config(SOURCE_LANGUAGE),
        resolver_file: args.trim.resolver.clone(),
        columnar: args.columnar,
        force: args.force,
    };

    let summary = run_languages(&args.languages, &opts);

    println!();
    println!("=== Summary ===");
    println!("Updated:            {}", summary.updated.join(" "));
    println!("Skipped:            {}", summary.skipped.join(" "));
    for (language, reason) in &summary.failed {
        println!("Failed {:<12} {}", format!("{}:", language), reason);
    }

    if !summary.failed.is_empty() && summary.updated.is_empty() && summary.skipped.is_empty() {
        anyhow::bail!("Every language failed");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Trim(args) => run_trim(args),
        Commands::Run(args) => run_all(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
