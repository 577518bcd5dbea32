use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected while building a category graph from dump records
#[derive(Default)]
pub struct BuildStats {
    pub pages_read: AtomicU64,
    pub links_read: AtomicU64,
    pub edges_added: AtomicU64,
    pub links_unresolved: AtomicU64,
    pub categories_read: AtomicU64,
    pub page_counts_set: AtomicU64,
    pub categories_unresolved: AtomicU64,
    pub records_rejected: AtomicU64,
    pub tuples_filtered: AtomicU64,
    pub lines_read: AtomicU64,
}

impl BuildStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_pages(&self) {
        self.pages_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_links(&self) {
        self.links_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_edges(&self) {
        self.edges_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_links_unresolved(&self) {
        self.links_unresolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_categories(&self) {
        self.categories_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_page_counts(&self) {
        self.page_counts_set.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_categories_unresolved(&self) {
        self.categories_unresolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rejected(&self, count: u64) {
        self.records_rejected.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_filtered(&self, count: u64) {
        self.tuples_filtered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_lines(&self, count: u64) {
        self.lines_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn pages(&self) -> u64 {
        self.pages_read.load(Ordering::Relaxed)
    }

    pub fn links(&self) -> u64 {
        self.links_read.load(Ordering::Relaxed)
    }

    pub fn edges(&self) -> u64 {
        self.edges_added.load(Ordering::Relaxed)
    }

    pub fn links_unresolved(&self) -> u64 {
        self.links_unresolved.load(Ordering::Relaxed)
    }

    pub fn categories(&self) -> u64 {
        self.categories_read.load(Ordering::Relaxed)
    }

    pub fn page_counts(&self) -> u64 {
        self.page_counts_set.load(Ordering::Relaxed)
    }

    pub fn categories_unresolved(&self) -> u64 {
        self.categories_unresolved.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.records_rejected.load(Ordering::Relaxed)
    }

    pub fn filtered(&self) -> u64 {
        self.tuples_filtered.load(Ordering::Relaxed)
    }

    pub fn lines(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_zero() {
        let stats = BuildStats::new();
        assert_eq!(stats.pages(), 0);
        assert_eq!(stats.links(), 0);
        assert_eq!(stats.edges(), 0);
        assert_eq!(stats.links_unresolved(), 0);
        assert_eq!(stats.categories(), 0);
        assert_eq!(stats.page_counts(), 0);
        assert_eq!(stats.categories_unresolved(), 0);
        assert_eq!(stats.rejected(), 0);
        assert_eq!(stats.filtered(), 0);
        assert_eq!(stats.lines(), 0);
    }

    #[test]
    fn links_split_into_edges_and_unresolved() {
        let stats = BuildStats::new();
        for _ in 0..3 {
            stats.inc_links();
        }
        stats.inc_edges();
        stats.inc_edges();
        stats.inc_links_unresolved();

        assert_eq!(stats.links(), 3);
        assert_eq!(stats.edges() + stats.links_unresolved(), stats.links());
    }

    #[test]
    fn add_counters_accumulate() {
        let stats = BuildStats::new();
        stats.add_rejected(2);
        stats.add_rejected(5);
        stats.add_filtered(10);
        stats.add_lines(4);
        stats.add_lines(1);
        assert_eq!(stats.rejected(), 7);
        assert_eq!(stats.filtered(), 10);
        assert_eq!(stats.lines(), 5);
    }
}
