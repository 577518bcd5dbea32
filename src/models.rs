use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type CategoryId = u32;

/// One row of the `category` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub name: String,
    pub page_count: i64,
    pub subcategory_count: i64,
}

impl CategoryRecord {
    /// Subcategories are counted as pages upstream; this is the page-only count.
    pub fn own_pages(&self) -> i64 {
        self.page_count - self.subcategory_count
    }
}

/// One `subcat` row of the `categorylinks` table: `child_id` is a member of `parent_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub child_id: CategoryId,
    pub parent_name: String,
}

/// One namespace-14 row of the `page` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub page_id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpRecord {
    Category(CategoryRecord),
    Link(LinkRecord),
    Page(PageRecord),
}

/// The three dump tables a category tree is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DumpTable {
    Category,
    CategoryLinks,
    Page,
}

impl DumpTable {
    pub const ALL: [DumpTable; 3] = [DumpTable::Page, DumpTable::CategoryLinks, DumpTable::Category];

    /// Key used in the dataset `meta` object.
    pub fn source_name(&self) -> &'static str {
        match self {
            DumpTable::Category => "category",
            DumpTable::CategoryLinks => "categorylinks",
            DumpTable::Page => "pagetable",
        }
    }

    /// Suffix of the dump file name, e.g. `enwiki-20240101-categorylinks.sql.gz`.
    pub fn file_stem(&self) -> &'static str {
        match self {
            DumpTable::Category => "category",
            DumpTable::CategoryLinks => "categorylinks",
            DumpTable::Page => "page",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    pub updated: NaiveDate,
}

/// Provenance of a dataset, keyed by [`DumpTable::source_name`].
pub type Meta = BTreeMap<String, SourceMeta>;
