use crate::models::{ExtractedFields, RawRow};

use super::MappingIndex;

/// Applies the mapping index to one raw row.
///
/// Extraction is header-driven, not position-driven: each cell is paired
/// with its header and looked up in the index, so files with reordered
/// columns extract identically. Unmapped headers and empty cells are
/// skipped; absent fields stay absent.
pub fn extract_row(row: &RawRow, headers: &[String], index: &MappingIndex) -> ExtractedFields {
    let mut fields = ExtractedFields::new();

    for (header, cell) in headers.iter().zip(row.cells.iter()) {
        let value = cell.trim();
        if value.is_empty() {
            continue;
        }
        if let Some(field) = index.field_for(header) {
            fields.insert(field, value);
        }
    }
    fields
}

/// Columns with no mapping but a non-empty value, as
/// `(column index, header, value)`. These become auto-detected attributes.
pub fn unmapped_columns(
    row: &RawRow,
    headers: &[String],
    index: &MappingIndex,
) -> Vec<(usize, String, String)> {
    headers
        .iter()
        .zip(row.cells.iter())
        .enumerate()
        .filter(|(_, (header, cell))| !index.is_mapped(header) && !cell.trim().is_empty())
        .map(|(i, (header, cell))| (i, header.clone(), cell.trim().to_string()))
        .collect()
}
