//! Trimming passes over a [`CategoryGraph`], and the pipeline that runs them in order.
//!
//! Every pass mutates the graph in place and returns how many nodes it removed.
//! Pass order matters:
//!
//! 1. [`add_root`] -- the synthetic root must exist before anything is protected
//!    or traversed
//! 2. [`remove_branch`] for hidden categories, then [`remove_excluded_branches`]
//!    -- administrative categories would otherwise skew the page-count distribution
//! 3. [`trim_by_percentile`] -- statistical pruning, sparing the protected set
//! 4. [`remove_unnamed`] -- ids that never resolved to a page name
//! 5. [`trim_by_depth`] -- keep what a depth-limited DFS from the root reaches

use crate::config::{RemovalPolicy, RootSeeds, TrimConfig, ROOT_ID, ROOT_NAME};
use crate::error::{Result, WikicatError};
use crate::graph::{CategoryGraph, CategoryNode};
use crate::models::CategoryId;
use crate::resolver::CategoryResolver;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

/// Removed-node counts per pass, for logging and run metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimReport {
    pub seeds_attached: usize,
    pub hidden_removed: usize,
    pub excluded_removed: usize,
    pub cutoff: i64,
    pub percentile_removed: usize,
    pub unnamed_removed: usize,
    pub depth_removed: usize,
    pub nodes: usize,
    pub edges: usize,
}

impl TrimReport {
    pub fn total_removed(&self) -> usize {
        self.hidden_removed
            + self.excluded_removed
            + self.percentile_removed
            + self.unnamed_removed
            + self.depth_removed
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "category"
    } else {
        "categories"
    }
}

/// Inserts the synthetic root and links it to every seed present in the graph.
///
/// Returns the number of seeds attached.
pub fn add_root(graph: &mut CategoryGraph, seeds: &[CategoryId]) -> usize {
    if !graph.contains(ROOT_ID) {
        graph.add_node(ROOT_ID, CategoryNode::named(ROOT_NAME, None));
    }

    let mut attached = 0;
    for &seed in seeds {
        if seed == ROOT_ID {
            continue;
        }
        if !graph.contains(seed) {
            debug!(seed, "Root seed is not in the graph");
            continue;
        }
        graph.add_edge(ROOT_ID, seed);
        attached += 1;
    }
    attached
}

/// The root and its direct children.
pub fn protected_set(graph: &CategoryGraph) -> FxHashSet<CategoryId> {
    let mut protected: FxHashSet<CategoryId> = graph.successors(ROOT_ID).collect();
    if graph.contains(ROOT_ID) {
        protected.insert(ROOT_ID);
    }
    protected
}

/// Removes `id` and its direct successors, protected or not. The root itself is never removed.
pub fn remove_branch(graph: &mut CategoryGraph, id: CategoryId) -> usize {
    remove_branches(graph, &[id])
}

/// Removes each branch head and its direct successors, all computed before any removal.
pub fn remove_branches(graph: &mut CategoryGraph, heads: &[CategoryId]) -> usize {
    let mut doomed: FxHashSet<CategoryId> = FxHashSet::default();
    for &head in heads {
        if !graph.contains(head) {
            continue;
        }
        doomed.insert(head);
        doomed.extend(graph.successors(head));
    }
    doomed.remove(&ROOT_ID);

    doomed
        .into_iter()
        .filter(|&id| graph.remove_node(id).is_some())
        .count()
}

/// Resolves each excluded title and removes its branch; titles that do not resolve are skipped.
pub fn remove_excluded_branches(
    graph: &mut CategoryGraph,
    titles: &[String],
    language: &str,
    resolver: &dyn CategoryResolver,
) -> Result<usize> {
    let mut heads = Vec::with_capacity(titles.len());
    for title in titles {
        match resolver.resolve(title, language) {
            Ok(id) => heads.push(id),
            Err(WikicatError::CategoryNotFound { .. }) => {
                debug!(title = %title, language, "Excluded branch not found, skipping");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(remove_branches(graph, &heads))
}

/// Linear interpolation between closest ranks over sorted values.
///
/// `h = (n - 1) * p / 100`; the result lies between `values[floor(h)]` and the
/// next value. An empty slice yields 0.
pub fn quantile(sorted: &[i64], percentile: u8) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let p = f64::from(percentile.min(100)) / 100.0;
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let lower = sorted[lo] as f64;
    let upper = sorted[hi] as f64;
    lower + (h - lo as f64) * (upper - lower)
}

/// Page-count threshold for `percentile`, never below 1.
///
/// The distribution is every recorded page count in the graph, protected
/// nodes included. Nodes without a recorded count (the root, categories
/// missing from the category table) do not contribute.
pub fn percentile_cutoff(graph: &CategoryGraph, percentile: u8) -> i64 {
    let mut counts: Vec<i64> = graph.nodes().filter_map(|(_, node)| node.page_count).collect();
    counts.sort_unstable();
    (quantile(&counts, percentile).trunc() as i64).max(1)
}

/// Removes unprotected nodes whose page count (missing = 0) is below `cutoff`.
///
/// Idempotent for a fixed `cutoff`: a second call removes nothing.
pub fn trim_below_cutoff(graph: &mut CategoryGraph, cutoff: i64, policy: RemovalPolicy) -> usize {
    let protected = protected_set(graph);

    let mut exclude: Vec<CategoryId> = graph
        .nodes()
        .filter(|(id, node)| !protected.contains(id) && node.page_count.unwrap_or(0) < cutoff)
        .map(|(id, _)| id)
        .collect();
    exclude.sort_unstable();

    for &id in &exclude {
        match policy {
            RemovalPolicy::Drop => graph.remove_node(id),
            RemovalPolicy::Reconnect => graph.remove_node_reconnect(id),
        };
    }
    exclude.len()
}

/// Computes the cutoff from the current graph and trims below it.
///
/// The cutoff is recomputed over the survivors on every call, so repeating this
/// can remove more. [`run_pipeline`] computes the cutoff once and calls
/// [`trim_below_cutoff`].
pub fn trim_by_percentile(graph: &mut CategoryGraph, percentile: u8, policy: RemovalPolicy) -> usize {
    let cutoff = percentile_cutoff(graph, percentile);
    trim_below_cutoff(graph, cutoff, policy)
}

/// Removes every non-root node without a resolved name.
pub fn remove_unnamed(graph: &mut CategoryGraph) -> usize {
    let exclude: Vec<CategoryId> = graph
        .nodes()
        .filter(|(id, node)| *id != ROOT_ID && node.name.is_none())
        .map(|(id, _)| id)
        .collect();

    for &id in &exclude {
        graph.remove_node(id);
    }
    exclude.len()
}

/// Keeps only what a DFS from the root reaches within `max_depth` (`None` = unbounded).
///
/// Without a root there is nothing to measure depth from, and nothing is removed.
pub fn trim_by_depth(graph: &mut CategoryGraph, max_depth: Option<u32>) -> usize {
    if !graph.contains(ROOT_ID) {
        warn!("Depth trim requested on a graph without a root, skipping");
        return 0;
    }
    let reachable = graph.dfs_reachable(ROOT_ID, max_depth);

    let exclude: Vec<CategoryId> = graph.node_ids().filter(|id| !reachable.contains(id)).collect();
    for &id in &exclude {
        graph.remove_node(id);
    }
    exclude.len()
}

fn resolve_root_seeds(
    seeds: &RootSeeds,
    language: &str,
    graph: &CategoryGraph,
    resolver: &dyn CategoryResolver,
) -> Result<Vec<CategoryId>> {
    let titles = seeds.titles();
    let ids: Vec<CategoryId> = match seeds {
        RootSeeds::Contents(title) => vec![resolver.resolve(title, language)?],
        RootSeeds::MainTopics(_) => resolver.resolve_all(&titles, language)?,
    };

    let present: Vec<CategoryId> = ids.into_iter().filter(|&id| graph.contains(id)).collect();
    if present.is_empty() {
        return Err(WikicatError::CategoryNotFound {
            title: titles.join(" | "),
            language: language.to_string(),
        });
    }
    Ok(present)
}

/// Runs every pass in order. Fails only if no root seed can be resolved.
pub fn run_pipeline(
    graph: &mut CategoryGraph,
    config: &TrimConfig,
    resolver: &dyn CategoryResolver,
) -> Result<TrimReport> {
    let language = config.language.as_str();
    let mut report = TrimReport::default();

    info!(language, categories = graph.node_count(), "Initial category tree");

    let seeds = resolve_root_seeds(&config.root_seeds, language, graph, resolver)?;
    report.seeds_attached = add_root(graph, &seeds);
    info!(language, seeds = report.seeds_attached, "Root added");

    if !config.keep_hidden {
        match resolver.resolve(&config.hidden_title, language) {
            Ok(hidden_id) => {
                report.hidden_removed = remove_branch(graph, hidden_id);
                info!(
                    language,
                    removed = report.hidden_removed,
                    "Excluding hidden {}",
                    plural(report.hidden_removed)
                );
            }
            Err(e) => warn!(language, error = %e, "Hidden category not resolved, keeping hidden categories"),
        }
    }

    report.excluded_removed =
        remove_excluded_branches(graph, &config.excluded_branch_titles, language, resolver)?;
    info!(
        language,
        removed = report.excluded_removed,
        "Excluding {} in excluded branches",
        plural(report.excluded_removed)
    );

    report.cutoff = percentile_cutoff(graph, config.pages_percentile);
    report.percentile_removed = trim_below_cutoff(graph, report.cutoff, config.removal_policy);
    info!(
        language,
        removed = report.percentile_removed,
        cutoff = report.cutoff,
        policy = ?config.removal_policy,
        "Excluding {} with less than {} page{}",
        plural(report.percentile_removed),
        report.cutoff,
        if report.cutoff == 1 { "" } else { "s" }
    );

    report.unnamed_removed = remove_unnamed(graph);
    info!(
        language,
        removed = report.unnamed_removed,
        "Excluding {} without a found name",
        plural(report.unnamed_removed)
    );

    report.depth_removed = trim_by_depth(graph, config.max_depth);
    info!(
        language,
        removed = report.depth_removed,
        max_depth = ?config.max_depth,
        "Excluding {} beyond max depth",
        plural(report.depth_removed)
    );

    report.nodes = graph.node_count();
    report.edges = graph.edge_count();
    info!(
        language,
        nodes = report.nodes,
        edges = report.edges,
        removed = report.total_removed(),
        "Trimmed category tree"
    );

    Ok(report)
}
