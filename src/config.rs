use crate::models::CategoryId;

/// Reserved id of the synthetic root (real page ids start at 1)
pub const ROOT_ID: CategoryId = 0;

/// Reserved name of the synthetic root
pub const ROOT_NAME: &str = "__root__";

/// MediaWiki namespace code for category pages
pub const CATEGORY_NAMESPACE: u32 = 14;

/// `cl_type` value marking a category-in-category membership
pub const SUBCAT_TYPE: &[u8] = b"subcat";

/// Progress update interval (tick every N records)
pub const PROGRESS_INTERVAL: u64 = 10_000;

pub const DEFAULT_PAGES_PERCENTILE: u8 = 65;

pub const DEFAULT_MAX_DEPTH: u32 = 100;

/// Language the built-in category titles are written in
pub const SOURCE_LANGUAGE: &str = "en";

pub const HIDDEN_CATEGORIES_TITLE: &str = "Category:Hidden categories";

pub const CONTENTS_TITLE: &str = "Category:Contents";

/// Administrative branches removed from every tree, hidden categories aside.
pub const DEFAULT_EXCLUDED_BRANCHES: &[&str] = &[
    "Category:Tracking categories",
    "Category:Container categories",
    "Category:Noindexed pages",
    "Category:Wikipedia 1.0 assessments",
    "Category:Wikipedia administration",
    "Category:Articles by importance",
    "Category:Articles by quality",
    "Category:Wikipedia categories",
    "Category:Stub categories",
    "Category:WikiProject templates",
    "Category:All redirect categories",
];

/// English "Main topic classifications", seeded as children of the root.
pub const MAIN_TOPICS: &[&str] = &[
    "Academic disciplines",
    "Business",
    "Communication",
    "Concepts",
    "Culture",
    "Economy",
    "Education",
    "Energy",
    "Engineering",
    "Entertainment",
    "Entities",
    "Ethics",
    "Food and drink",
    "Geography",
    "Government",
    "Health",
    "History",
    "Human behavior",
    "Humanities",
    "Information",
    "Internet",
    "Knowledge",
    "Language",
    "Law",
    "Life",
    "Mass media",
    "Mathematics",
    "Military",
    "Nature",
    "People",
    "Philosophy",
    "Politics",
    "Religion",
    "Science",
    "Society",
    "Sports",
    "Technology",
    "Time",
    "Universe",
];

/// What happens to the edges of a node removed by the percentile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Delete the node and its incident edges.
    #[default]
    Drop,
    /// Link every predecessor to every successor before deleting the node.
    Reconnect,
}

/// Where the synthetic root's children come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSeeds {
    /// Category titles (in [`SOURCE_LANGUAGE`]) attached directly under the root.
    MainTopics(Vec<String>),
    /// A single "Contents"-like category that becomes the root's only child.
    Contents(String),
}

impl RootSeeds {
    pub fn titles(&self) -> Vec<String> {
        match self {
            RootSeeds::MainTopics(topics) => topics
                .iter()
                .map(|t| {
                    if t.starts_with("Category:") {
                        t.clone()
                    } else {
                        format!("Category:{}", t)
                    }
                })
                .collect(),
            RootSeeds::Contents(title) => vec![title.clone()],
        }
    }
}

impl Default for RootSeeds {
    fn default() -> Self {
        RootSeeds::MainTopics(MAIN_TOPICS.iter().map(|t| t.to_string()).collect())
    }
}

/// Options consumed by the trimming pipeline for one language run.
#[derive(Debug, Clone)]
pub struct TrimConfig {
    pub language: String,
    pub pages_percentile: u8,
    /// `None` keeps everything reachable from the root.
    pub max_depth: Option<u32>,
    pub keep_hidden: bool,
    pub removal_policy: RemovalPolicy,
    pub excluded_branch_titles: Vec<String>,
    pub root_seeds: RootSeeds,
    pub hidden_title: String,
}

impl TrimConfig {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            ..Self::default()
        }
    }

    /// Clamps into `0..=100`, accepting any integer the way the CLI does.
    pub fn with_percentile(mut self, percentile: i64) -> Self {
        self.pages_percentile = clamp_percentile(percentile);
        self
    }
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            language: SOURCE_LANGUAGE.to_string(),
            pages_percentile: DEFAULT_PAGES_PERCENTILE,
            max_depth: Some(DEFAULT_MAX_DEPTH),
            keep_hidden: false,
            removal_policy: RemovalPolicy::Drop,
            excluded_branch_titles: DEFAULT_EXCLUDED_BRANCHES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            root_seeds: RootSeeds::default(),
            hidden_title: HIDDEN_CATEGORIES_TITLE.to_string(),
        }
    }
}

pub fn clamp_percentile(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}
