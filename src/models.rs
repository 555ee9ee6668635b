use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// One worksheet row as read by the (external) file decoder: the raw cell
/// strings plus the 1-based row number used in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub number: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(number: usize, cells: Vec<String>) -> Self {
        Self { number, cells }
    }
}

/// How one canonical field is located in the source sheet: either by column
/// position or by header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKey {
    Index(usize),
    Header(String),
}

impl From<usize> for ColumnKey {
    fn from(index: usize) -> Self {
        ColumnKey::Index(index)
    }
}

impl From<&str> for ColumnKey {
    fn from(header: &str) -> Self {
        ColumnKey::Header(header.to_string())
    }
}

/// Ordered map from canonical field name to source column. Built once per
/// import session; a field may simply be absent from the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<(String, ColumnKey)>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, key: impl Into<ColumnKey>) {
        self.entries.push((field.into(), key.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnKey)> {
        self.entries.iter().map(|(f, k)| (f.as_str(), k))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Restores a mapping from its JSON form (e.g. a cached mapping), where
    /// each value is either a column index or a header name. Malformed
    /// entries are dropped with a warning rather than failing the session.
    pub fn from_json(value: &Value) -> Self {
        let mut mapping = Self::new();
        let Some(object) = value.as_object() else {
            warn!("column mapping is not a JSON object, ignoring");
            return mapping;
        };

        for (field, key) in object {
            match key {
                Value::Number(n) => match n.as_u64() {
                    Some(index) => mapping.insert(field.clone(), ColumnKey::Index(index as usize)),
                    None => warn!(field = %field, "non-integral column index {}, dropped", n),
                },
                Value::String(header) => {
                    mapping.insert(field.clone(), ColumnKey::Header(header.clone()));
                }
                other => {
                    warn!(field = %field, "malformed mapping entry {:?}, dropped", other);
                }
            }
        }
        mapping
    }
}

/// Canonical field name → raw string value for one row. Absent keys mean
/// "not supplied"; nothing is defaulted at this stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    values: BTreeMap<String, String>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl FromIterator<(String, String)> for ExtractedFields {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Parent linkage derived from one row's SKU and title. Always fully
/// populated: `color` falls back to `"Default"` and `product_name` to
/// `"Product {parent_sku}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentInfo {
    pub parent_sku: String,
    pub product_name: String,
    pub color: String,
    pub width: Option<i32>,
    pub drop: Option<i32>,
}

/// Terminal state of one processed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportRowOutcome {
    Created,
    Updated,
    Skipped(String),
    Error(String),
}

/// Aggregate summary of one import run.
///
/// Accumulated functionally per row (owned value, no shared counters) so the
/// pipeline stays safe if rows are ever processed concurrently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub created_products: u64,
    pub updated_products: u64,
    pub created_variants: u64,
    pub updated_variants: u64,
    pub skipped_rows: u64,
    pub errors: Vec<String>,
}

impl ImportResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_product(&mut self, created: bool) {
        if created {
            self.created_products += 1;
        } else {
            self.updated_products += 1;
        }
    }

    pub fn record_variant(&mut self, created: bool) {
        if created {
            self.created_variants += 1;
        } else {
            self.updated_variants += 1;
        }
    }

    pub fn record_skip(&mut self, row: usize, message: impl Into<String>) {
        self.skipped_rows += 1;
        self.errors.push(format!("Row {}: {}", row, message.into()));
    }

    /// Folds one row's terminal state into the summary.
    pub fn record_outcome(&mut self, row: usize, outcome: &ImportRowOutcome) {
        match outcome {
            ImportRowOutcome::Created => self.created_variants += 1,
            ImportRowOutcome::Updated => self.updated_variants += 1,
            ImportRowOutcome::Skipped(reason) => self.record_skip(row, reason.clone()),
            ImportRowOutcome::Error(message) => {
                // An errored row is still a row the import did not land, so
                // it counts against the skip threshold too.
                self.skipped_rows += 1;
                self.errors.push(format!("Row {}: {}", row, message));
            }
        }
    }

    /// Folds another result (e.g. one chunk's) into this one.
    pub fn merge(&mut self, other: ImportResult) {
        self.created_products += other.created_products;
        self.updated_products += other.updated_products;
        self.created_variants += other.created_variants;
        self.updated_variants += other.updated_variants;
        self.skipped_rows += other.skipped_rows;
        self.errors.extend(other.errors);
    }

    /// Total rows that made it through to an upsert.
    pub fn processed(&self) -> u64 {
        self.created_variants + self.updated_variants
    }

    /// Zero processed rows with a nonzero error count signals a systemic
    /// problem (usually a wrong column mapping), not per-row defects.
    pub fn has_systemic_failure(&self) -> bool {
        self.processed() == 0 && self.created_products == 0 && !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_from_json_mixed_keys() {
        let mapping = ColumnMapping::from_json(&json!({
            "sku": 0,
            "product_name": "Product Title",
            "price": null
        }));

        // The null entry is dropped, the others survive
        assert_eq!(mapping.len(), 2);
        let keys: Vec<_> = mapping.iter().collect();
        assert!(keys.contains(&("sku", &ColumnKey::Index(0))));
        assert!(keys.contains(&(
            "product_name",
            &ColumnKey::Header("Product Title".to_string())
        )));
    }

    #[test]
    fn test_mapping_from_json_not_an_object() {
        let mapping = ColumnMapping::from_json(&json!([1, 2, 3]));
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_result_merge() {
        let mut a = ImportResult::new();
        a.record_product(true);
        a.record_variant(true);

        let mut b = ImportResult::new();
        b.record_product(false);
        b.record_variant(false);
        b.record_skip(7, "bad price");

        a.merge(b);
        assert_eq!(a.created_products, 1);
        assert_eq!(a.updated_products, 1);
        assert_eq!(a.created_variants, 1);
        assert_eq!(a.updated_variants, 1);
        assert_eq!(a.skipped_rows, 1);
        assert_eq!(a.errors.len(), 1);
        assert!(a.errors[0].starts_with("Row 7:"));
    }

    #[test]
    fn test_record_outcome_folds_each_state() {
        let mut result = ImportResult::new();
        result.record_outcome(2, &ImportRowOutcome::Created);
        result.record_outcome(3, &ImportRowOutcome::Updated);
        result.record_outcome(4, &ImportRowOutcome::Skipped("no sku".into()));
        result.record_outcome(5, &ImportRowOutcome::Error("constraint".into()));

        assert_eq!(result.created_variants, 1);
        assert_eq!(result.updated_variants, 1);
        // The skip and the error both count against skipped_rows and each
        // leaves a message behind.
        assert_eq!(result.skipped_rows, 2);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[1].starts_with("Row 5:"));
    }

    #[test]
    fn test_systemic_failure_signal() {
        let mut result = ImportResult::new();
        result.record_skip(2, "no mapping");
        result.record_skip(3, "no mapping");
        assert!(result.has_systemic_failure());

        result.record_variant(true);
        assert!(!result.has_systemic_failure());
    }
}
