//! Source-distribution statistics over a feed snapshot

use serde::{Deserialize, Serialize};

/// Share of a snapshot's items that link to one domain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsSourceDistribution {
    pub domain: String,
    pub count: usize,
    /// In `[0, 1]`
    pub percentage: f64,
}

/// One section of the category picker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    pub category_type: String,
    pub categories: Vec<String>,
}
