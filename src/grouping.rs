use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::ExtractedFields;
use crate::resolution::colors;

/// Injected name-similarity clustering strategy. The exact algorithm is a
/// collaborator concern; the engine only requires determinism. No ordering
/// is guaranteed across groups.
pub trait NameSimilarityGrouper: Send + Sync {
    fn group(&self, names: &[String]) -> Vec<Vec<String>>;
}

/// Reference grouper: clusters names sharing their first two significant
/// lowercased tokens. Deterministic, good enough as a default and for tests.
#[derive(Debug, Default)]
pub struct LeadingTokenGrouper;

impl NameSimilarityGrouper for LeadingTokenGrouper {
    fn group(&self, names: &[String]) -> Vec<Vec<String>> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();

        for name in names {
            let key = name
                .to_lowercase()
                .split_whitespace()
                .take(2)
                .collect::<Vec<_>>()
                .join(" ");
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(name.clone()),
                None => groups.push((key, vec![name.clone()])),
            }
        }
        groups.into_iter().map(|(_, members)| members).collect()
    }
}

/// One bucket of rows sharing a parent, identified by a deterministic key.
/// `rows` are indexes into the batch the engine was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentGroup {
    pub key: String,
    pub parent_name: String,
    pub rows: Vec<usize>,
}

impl ParentGroup {
    /// Numeric SKU prefix for buckets keyed by one, `None` for buckets keyed
    /// by an explicit or cleaned name.
    pub fn sku_prefix(&self) -> Option<&str> {
        let rest = self.key.strip_prefix("sku:")?;
        Some(rest.split(':').next().unwrap_or(rest))
    }
}

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").expect("valid regex"));

static TRAILING_DASH_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+-\s+[^-]*$").expect("valid regex"));

static SIZE_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d+\s*cm(\s*x\s*\d+\s*cm)?|\b(small|medium|large|extra large)\b")
        .expect("valid regex")
});

static NUMERIC_PREFIX_SKU: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{3})-\d{3}$").expect("valid regex"));

/// Buckets otherwise-unparented rows into parent groups.
///
/// Key priority per row: an explicit parent name, then a two-part numeric
/// SKU prefix, then a hash of the cleaned product name. Buckets with more
/// than one member are refined through the injected similarity grouper so
/// that rows sharing a key but diverging in name split apart.
pub struct GroupingEngine {
    grouper: Arc<dyn NameSimilarityGrouper>,
}

impl Default for GroupingEngine {
    fn default() -> Self {
        Self::new(Arc::new(LeadingTokenGrouper))
    }
}

impl GroupingEngine {
    pub fn new(grouper: Arc<dyn NameSimilarityGrouper>) -> Self {
        Self { grouper }
    }

    pub fn group_rows(&self, rows: &[ExtractedFields]) -> Vec<ParentGroup> {
        let mut groups: Vec<ParentGroup> = Vec::new();

        for (row_index, fields) in rows.iter().enumerate() {
            let (key, parent_name) = self.key_for(fields);
            match groups.iter_mut().find(|g| g.key == key) {
                Some(group) => group.rows.push(row_index),
                None => groups.push(ParentGroup {
                    key,
                    parent_name,
                    rows: vec![row_index],
                }),
            }
        }

        debug!(buckets = groups.len(), "initial parent bucketing complete");
        self.refine(groups, rows)
    }

    fn key_for(&self, fields: &ExtractedFields) -> (String, String) {
        if let Some(parent_name) = fields.get("parent_name") {
            let trimmed = parent_name.trim();
            return (format!("name:{:x}", hash64(trimmed)), trimmed.to_string());
        }

        if let Some(sku) = fields.get("sku") {
            if let Some(caps) = NUMERIC_PREFIX_SKU.captures(sku.trim()) {
                let prefix = caps[1].to_string();
                let name = fields
                    .get("product_name")
                    .map(|n| clean_name(n))
                    .unwrap_or_else(|| format!("Product {}", prefix));
                return (format!("sku:{}", prefix), name);
            }
        }

        let cleaned = fields.get("product_name").map(clean_name).unwrap_or_default();
        (format!("fuzzy:{:x}", hash64(&cleaned)), cleaned)
    }

    /// Splits multi-member buckets whose product names diverge despite
    /// sharing a key.
    fn refine(&self, groups: Vec<ParentGroup>, rows: &[ExtractedFields]) -> Vec<ParentGroup> {
        let mut refined = Vec::new();

        for group in groups {
            if group.rows.len() <= 1 {
                refined.push(group);
                continue;
            }

            let names: Vec<String> = group
                .rows
                .iter()
                .map(|&i| {
                    rows[i]
                        .get("product_name")
                        .unwrap_or(&group.parent_name)
                        .to_string()
                })
                .collect();

            let clusters = self.grouper.group(&names);
            if clusters.len() <= 1 {
                refined.push(group);
                continue;
            }

            let mut remaining: Vec<usize> = group.rows.clone();
            let mut used_names: Vec<String> = Vec::new();
            for (sub_index, cluster) in clusters.into_iter().enumerate() {
                let mut member_rows = Vec::new();
                for name in &cluster {
                    if let Some(pos) = remaining.iter().position(|&i| {
                        rows[i]
                            .get("product_name")
                            .unwrap_or(&group.parent_name)
                            == name
                    }) {
                        member_rows.push(remaining.remove(pos));
                    }
                }
                if member_rows.is_empty() {
                    continue;
                }
                let cleaned = cluster
                    .first()
                    .map(|n| clean_name(n))
                    .unwrap_or_else(|| group.parent_name.clone());
                // Cleaning can collapse two diverging clusters onto the same
                // name; fall back to the raw cluster name so the split
                // survives into the parent identity.
                let parent_name = if used_names.contains(&cleaned) {
                    cluster.first().cloned().unwrap_or(cleaned)
                } else {
                    cleaned
                };
                used_names.push(parent_name.clone());
                refined.push(ParentGroup {
                    key: format!("{}:{}", group.key, sub_index),
                    parent_name,
                    rows: member_rows,
                });
            }
        }
        refined
    }
}

/// Cleans a product name for use as a grouping key: bracketed and
/// parenthetical content, trailing dash suffixes, size tokens and color
/// words all go.
pub fn clean_name(name: &str) -> String {
    let cleaned = BRACKETED.replace_all(name, " ");
    let cleaned = TRAILING_DASH_SUFFIX.replace_all(&cleaned, " ");
    let cleaned = SIZE_WORDS.replace_all(&cleaned, " ");
    let cleaned = colors::strip_all_colors(&cleaned);
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn hash64(value: &str) -> u64 {
    // DefaultHasher::new() uses fixed keys, so group keys are stable across
    // runs and re-imports resolve to the same parents.
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
