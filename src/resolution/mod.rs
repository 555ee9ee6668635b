//! Parent/variant inference from ambiguous SKU and title text: dimension
//! extraction, color resolution and the layered SKU grammars.

pub mod colors;
pub mod dimensions;
pub mod parent_info;

pub use colors::{color_from_title, strip_all_colors, strip_color, DEFAULT_COLOR};
pub use dimensions::{extract_dimensions, has_dimension_token, Dimensions};
pub use parent_info::{base_product_name, classify_sku, resolve_parent_info, SkuPattern};
