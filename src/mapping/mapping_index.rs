use std::collections::HashMap;

use tracing::warn;

use crate::models::{ColumnKey, ColumnMapping};

/// Header-name → canonical-field lookup built once per import session.
///
/// Mapping entries may address columns by position or by header name; both
/// are resolved to header names here so that columns can be reordered
/// between files without re-mapping.
#[derive(Debug, Clone, Default)]
pub struct MappingIndex {
    by_header: HashMap<String, String>,
}

impl MappingIndex {
    /// Resolves the mapping against the worksheet's header sequence.
    /// Position keys beyond the header range are dropped with a warning;
    /// dropping an entry is never fatal.
    pub fn build(headers: &[String], mapping: &ColumnMapping) -> Self {
        let mut by_header = HashMap::new();

        for (field, key) in mapping.iter() {
            let header = match key {
                ColumnKey::Index(i) => match headers.get(*i) {
                    Some(h) => h.clone(),
                    None => {
                        warn!(
                            field = %field,
                            index = i,
                            "mapping index out of range for {} headers, entry dropped",
                            headers.len()
                        );
                        continue;
                    }
                },
                ColumnKey::Header(h) => h.clone(),
            };
            by_header.insert(header, field.to_string());
        }

        Self { by_header }
    }

    /// Canonical field mapped to this header, if any.
    pub fn field_for(&self, header: &str) -> Option<&str> {
        self.by_header.get(header).map(String::as_str)
    }

    pub fn is_mapped(&self, header: &str) -> bool {
        self.by_header.contains_key(header)
    }

    pub fn len(&self) -> usize {
        self.by_header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_header.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        vec![
            "Item Code".to_string(),
            "Description".to_string(),
            "RRP".to_string(),
        ]
    }

    #[test]
    fn test_position_keys_resolve_through_headers() {
        let mut mapping = ColumnMapping::new();
        mapping.insert("sku", 0usize);
        mapping.insert("price", 2usize);

        let index = MappingIndex::build(&headers(), &mapping);
        assert_eq!(index.field_for("Item Code"), Some("sku"));
        assert_eq!(index.field_for("RRP"), Some("price"));
        assert_eq!(index.field_for("Description"), None);
    }

    #[test]
    fn test_header_keys_used_verbatim() {
        let mut mapping = ColumnMapping::new();
        mapping.insert("description", "Description");

        let index = MappingIndex::build(&headers(), &mapping);
        assert_eq!(index.field_for("Description"), Some("description"));
    }

    #[test]
    fn test_out_of_range_index_dropped_non_fatally() {
        let mut mapping = ColumnMapping::new();
        mapping.insert("sku", 0usize);
        mapping.insert("barcode", 99usize);

        let index = MappingIndex::build(&headers(), &mapping);
        assert_eq!(index.len(), 1);
        assert_eq!(index.field_for("Item Code"), Some("sku"));
    }
}
