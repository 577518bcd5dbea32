use crate::config::PROGRESS_INTERVAL;
use crate::graph::{CategoryGraph, CategoryNode};
use crate::models::{CategoryId, CategoryRecord, DumpTable, LinkRecord, PageRecord};
use crate::parser::DumpReader;
use crate::stats::BuildStats;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rustc_hash::FxHashMap;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Category page names and ids from the page table, in both directions.
pub struct CategoryIndex {
    id_to_name: FxHashMap<CategoryId, String>,
    name_to_id: FxHashMap<String, CategoryId>,
    /// Ids in order of first appearance.
    order: Vec<CategoryId>,
}

impl CategoryIndex {
    /// A repeated id keeps its last name. `name_to_id` is then the inverse of
    /// the final id -> name map; a name shared by several ids resolves to the
    /// one that appeared last.
    pub fn build<P>(pages: P, stats: &BuildStats) -> io::Result<Self>
    where
        P: IntoIterator<Item = io::Result<PageRecord>>,
    {
        let mut index = Self::empty();
        for page in pages {
            index.insert(page?);
            stats.inc_pages();
        }
        index.invert();

        info!(categories = index.len(), "Category index built");
        Ok(index)
    }

    pub fn from_pages(pages: impl IntoIterator<Item = (CategoryId, String)>) -> Self {
        let mut index = Self::empty();
        for (page_id, name) in pages {
            index.insert(PageRecord { page_id, name });
        }
        index.invert();
        index
    }

    fn empty() -> Self {
        Self {
            id_to_name: FxHashMap::default(),
            name_to_id: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    fn insert(&mut self, page: PageRecord) {
        if self.id_to_name.insert(page.page_id, page.name).is_none() {
            self.order.push(page.page_id);
        }
    }

    fn invert(&mut self) {
        self.name_to_id.clear();
        for &id in &self.order {
            if let Some(name) = self.id_to_name.get(&id) {
                self.name_to_id.insert(name.clone(), id);
            }
        }
    }

    pub fn resolve_id(&self, name: &str) -> Option<CategoryId> {
        self.name_to_id.get(name).copied()
    }

    pub fn name(&self, id: CategoryId) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    pub fn contains_id(&self, id: CategoryId) -> bool {
        self.id_to_name.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }

    /// Resolves links and page counts against this index.
    ///
    /// Links whose parent name or child id is unknown are dropped, as are
    /// category rows whose name has no page. Every indexed id becomes a node.
    pub fn build_graph<L, C>(&self, links: L, categories: C, stats: &BuildStats) -> io::Result<CategoryGraph>
    where
        L: IntoIterator<Item = io::Result<LinkRecord>>,
        C: IntoIterator<Item = io::Result<CategoryRecord>>,
    {
        let mut graph = CategoryGraph::with_capacity(self.id_to_name.len());
        for (&id, name) in &self.id_to_name {
            graph.add_node(id, CategoryNode::named(name.clone(), None));
        }

        for link in links {
            let link = link?;
            stats.inc_links();

            match self.resolve_id(&link.parent_name) {
                Some(parent) if self.contains_id(link.child_id) => {
                    if graph.add_edge(parent, link.child_id) {
                        stats.inc_edges();
                    }
                }
                _ => {
                    debug!(child = link.child_id, parent = %link.parent_name, "Unresolved category link");
                    stats.inc_links_unresolved();
                }
            }
        }

        for category in categories {
            let category = category?;
            stats.inc_categories();

            match self.resolve_id(&category.name) {
                Some(id) => {
                    graph.set_page_count(id, category.own_pages());
                    stats.inc_page_counts();
                }
                None => stats.inc_categories_unresolved(),
            }
        }

        Ok(graph)
    }
}

fn with_progress<I: Iterator>(iter: I, pb: ProgressBar) -> impl Iterator<Item = I::Item> {
    iter.enumerate().map(move |(i, item)| {
        if i as u64 % PROGRESS_INTERVAL == 0 {
            pb.tick();
        }
        item
    })
}

/// Streams the three dump files and builds the unpruned category graph.
pub fn build_from_dumps(page: &Path, category_links: &Path, category: &Path, stats: &BuildStats) -> Result<CategoryGraph> {
    let pb = ProgressBar::new_spinner();

    info!("Building category index from: {}", page.display());
    pb.set_message("page table");
    let mut pages = DumpReader::open(page)
        .with_context(|| format!("Failed to open page dump at: {}", page.display()))?
        .records::<PageRecord>(DumpTable::Page);
    let index = CategoryIndex::build(with_progress(pages.by_ref(), pb.clone()), stats)
        .with_context(|| format!("Failed to read page dump: {}", page.display()))?;
    record_reader_stats(stats, pages.lines_read(), pages.rejected(), pages.filtered());

    info!("Resolving category links from: {}", category_links.display());
    pb.set_message("categorylinks table");
    let mut links = DumpReader::open(category_links)
        .with_context(|| format!("Failed to open categorylinks dump at: {}", category_links.display()))?
        .records::<LinkRecord>(DumpTable::CategoryLinks);

    info!("Reading page counts from: {}", category.display());
    let mut categories = DumpReader::open(category)
        .with_context(|| format!("Failed to open category dump at: {}", category.display()))?
        .records::<CategoryRecord>(DumpTable::Category);

    let graph = index
        .build_graph(
            with_progress(links.by_ref(), pb.clone()),
            with_progress(categories.by_ref(), pb.clone()),
            stats,
        )
        .context("Failed to read categorylinks or category dump")?;
    record_reader_stats(stats, links.lines_read(), links.rejected(), links.filtered());
    record_reader_stats(stats, categories.lines_read(), categories.rejected(), categories.filtered());

    pb.finish_and_clear();

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        unresolved_links = stats.links_unresolved(),
        unresolved_categories = stats.categories_unresolved(),
        rejected = stats.rejected(),
        "Category graph built"
    );

    Ok(graph)
}

fn record_reader_stats(stats: &BuildStats, lines: u64, rejected: u64, filtered: u64) {
    stats.add_lines(lines);
    stats.add_rejected(rejected);
    stats.add_filtered(filtered);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok<T>(items: Vec<T>) -> Vec<io::Result<T>> {
        items.into_iter().map(Ok).collect()
    }

    fn link(child_id: CategoryId, parent: &str) -> LinkRecord {
        LinkRecord {
            child_id,
            parent_name: parent.to_string(),
        }
    }

    fn category(name: &str, pages: i64, subcats: i64) -> CategoryRecord {
        CategoryRecord {
            name: name.to_string(),
            page_count: pages,
            subcategory_count: subcats,
        }
    }

    #[test]
    fn resolve_direct_name() {
        let index = CategoryIndex::from_pages(vec![(1, "Science".to_string()), (2, "Physics".to_string())]);
        assert_eq!(index.resolve_id("Science"), Some(1));
        assert_eq!(index.resolve_id("Physics"), Some(2));
        assert_eq!(index.name(2), Some("Physics"));
    }

    #[test]
    fn resolve_case_sensitive() {
        let index = CategoryIndex::from_pages(vec![(1, "Science".to_string())]);
        assert_eq!(index.resolve_id("science"), None);
    }

    #[test]
    fn duplicate_name_last_record_wins() {
        let index = CategoryIndex::from_pages(vec![(1, "Dup".to_string()), (2, "Dup".to_string())]);
        assert_eq!(index.resolve_id("Dup"), Some(2));
        assert_eq!(index.name(1), Some("Dup"));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn duplicate_id_last_name_wins() {
        let index = CategoryIndex::from_pages(vec![(1, "Old".to_string()), (1, "New".to_string())]);
        assert_eq!(index.resolve_id("New"), Some(1));
        assert_eq!(index.resolve_id("Old"), None);
        assert_eq!(index.name(1), Some("New"));
    }

    #[test]
    fn renamed_id_releases_name_to_remaining_owner() {
        let index = CategoryIndex::from_pages(vec![
            (1, "A".to_string()),
            (2, "A".to_string()),
            (2, "B".to_string()),
        ]);
        assert_eq!(index.resolve_id("A"), Some(1));
        assert_eq!(index.resolve_id("B"), Some(2));
        assert_eq!(index.name(1), Some("A"));
    }

    #[test]
    fn renamed_id_keeps_links_and_counts_of_remaining_owner() {
        let index = CategoryIndex::from_pages(vec![
            (1, "A".to_string()),
            (2, "A".to_string()),
            (2, "B".to_string()),
            (3, "C".to_string()),
        ]);
        let stats = BuildStats::new();
        let graph = index
            .build_graph(ok(vec![link(3, "A")]), ok(vec![category("A", 6, 1)]), &stats)
            .unwrap();

        assert!(graph.has_edge(1, 3));
        assert_eq!(graph.page_count(1), Some(5));
        assert_eq!(graph.page_count(2), None);
    }

    #[test]
    fn duplicate_link_counts_one_edge() {
        let index = CategoryIndex::from_pages(vec![(7, "Science".to_string()), (100, "Physics".to_string())]);
        let stats = BuildStats::new();
        let graph = index
            .build_graph(ok(vec![link(100, "Science"), link(100, "Science")]), ok(vec![]), &stats)
            .unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(stats.links(), 2);
        assert_eq!(stats.edges(), 1);
        assert_eq!(stats.links_unresolved(), 0);
    }

    #[test]
    fn link_to_known_child_becomes_edge() {
        let index = CategoryIndex::from_pages(vec![(7, "Science".to_string()), (100, "Physics".to_string())]);
        let stats = BuildStats::new();
        let graph = index
            .build_graph(ok(vec![link(100, "Science")]), ok(vec![]), &stats)
            .unwrap();

        assert!(graph.has_edge(7, 100));
        assert_eq!(stats.edges(), 1);
    }

    #[test]
    fn link_to_unknown_child_is_dropped() {
        let index = CategoryIndex::from_pages(vec![(7, "Science".to_string())]);
        let stats = BuildStats::new();
        let graph = index
            .build_graph(ok(vec![link(100, "Science"), link(7, "Deleted")]), ok(vec![]), &stats)
            .unwrap();

        assert_eq!(graph.edge_count(), 0);
        assert_eq!(stats.links_unresolved(), 2);
    }

    #[test]
    fn page_count_subtracts_subcategories() {
        let index = CategoryIndex::from_pages(vec![(5, "Foo's_Bar".to_string())]);
        let stats = BuildStats::new();
        let graph = index
            .build_graph(ok(vec![]), ok(vec![category("Foo's_Bar", 12, 3), category("Gone", 4, 0)]), &stats)
            .unwrap();

        assert_eq!(graph.page_count(5), Some(9));
        assert_eq!(stats.categories_unresolved(), 1);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn negative_page_count_passes_through() {
        let index = CategoryIndex::from_pages(vec![(5, "Odd".to_string())]);
        let graph = index
            .build_graph(ok(vec![]), ok(vec![category("Odd", 1, 4)]), &BuildStats::new())
            .unwrap();
        assert_eq!(graph.page_count(5), Some(-3));
    }

    #[test]
    fn category_without_row_has_no_count() {
        let index = CategoryIndex::from_pages(vec![(5, "Bare".to_string())]);
        let graph = index.build_graph(ok(vec![]), ok(vec![]), &BuildStats::new()).unwrap();
        assert_eq!(graph.name(5), Some("Bare"));
        assert_eq!(graph.page_count(5), None);
    }

    #[test]
    fn io_error_aborts_build() {
        let index = CategoryIndex::from_pages(vec![(1, "A".to_string())]);
        let links: Vec<io::Result<LinkRecord>> = vec![Err(io::Error::other("truncated stream"))];
        assert!(index.build_graph(links, ok(vec![]), &BuildStats::new()).is_err());
    }
}
