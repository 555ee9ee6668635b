//! Column-mapping layer: guessing canonical fields from arbitrary headers,
//! resolving a session mapping into a header lookup, and extracting
//! canonical field records from raw rows.

pub mod field_mapper;
pub mod mapping_index;
pub mod row_extractor;

pub use field_mapper::{normalize_header, FieldMapper};
pub use mapping_index::MappingIndex;
pub use row_extractor::{extract_row, unmapped_columns};
