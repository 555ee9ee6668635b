use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ParentInfo;

use super::colors::{self, DEFAULT_COLOR};
use super::dimensions;

/// Which of the mutually exclusive SKU grammars a value matched. Produced by
/// a single ordered classify function so the priority stays explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkuPattern {
    /// `NNN-NNN-NNN`: parent is the first two groups
    ThreePartNumeric {
        parent_sku: String,
        variant_suffix: String,
    },
    /// `NNN-NNN`: parent is the first group
    TwoPartNumeric {
        parent_sku: String,
        variant_suffix: String,
    },
    /// Anything else: a trailing letter suffix is the color, the rest the
    /// parent. The most permissive grammar, by design never an error.
    AlphanumericColor {
        parent_sku: String,
        color: Option<String>,
    },
}

impl SkuPattern {
    pub fn parent_sku(&self) -> &str {
        match self {
            SkuPattern::ThreePartNumeric { parent_sku, .. }
            | SkuPattern::TwoPartNumeric { parent_sku, .. }
            | SkuPattern::AlphanumericColor { parent_sku, .. } => parent_sku,
        }
    }
}

static THREE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{3}-\d{3})-(\d{3})$").expect("valid regex"));

static TWO_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{3})-(\d{3})$").expect("valid regex"));

static LETTER_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)-([A-Za-z]+)$").expect("valid regex"));

/// Dimension tokens stripped out of titles when deriving the base name
static DIMENSION_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+\s*cm(\s*x\s*\d+\s*cm)?").expect("valid regex"));

/// Classifies a SKU against the three grammars, in priority order.
pub fn classify_sku(sku: &str) -> SkuPattern {
    let sku = sku.trim();

    if let Some(caps) = THREE_PART.captures(sku) {
        return SkuPattern::ThreePartNumeric {
            parent_sku: caps[1].to_string(),
            variant_suffix: caps[2].to_string(),
        };
    }
    if let Some(caps) = TWO_PART.captures(sku) {
        return SkuPattern::TwoPartNumeric {
            parent_sku: caps[1].to_string(),
            variant_suffix: caps[2].to_string(),
        };
    }

    // Fallback: strip a trailing letter suffix to get the parent; when the
    // last hyphen segment carries a letter it doubles as the color.
    let parent_sku = LETTER_SUFFIX
        .captures(sku)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| sku.to_string());

    let color = sku
        .contains('-')
        .then(|| sku.rsplit('-').next())
        .flatten()
        .filter(|segment| segment.chars().any(|c| c.is_alphabetic()))
        .map(|segment| segment.to_string());

    SkuPattern::AlphanumericColor { parent_sku, color }
}

/// Derives the fully populated parent linkage for one row.
///
/// Pure and deterministic given `(sku, title)`: parent SKU from the grammar,
/// color from the SKU segment or the title, dimensions from the title, and
/// a base product name stripped of both.
pub fn resolve_parent_info(sku: &str, title: &str) -> ParentInfo {
    let pattern = classify_sku(sku);
    let parent_sku = pattern.parent_sku().to_string();

    let color = match &pattern {
        SkuPattern::AlphanumericColor { color: Some(c), .. } => c.clone(),
        _ => colors::color_from_title(title).unwrap_or_else(|| DEFAULT_COLOR.to_string()),
    };

    let dims = dimensions::extract_dimensions(title);
    let product_name = base_product_name(title, &color, &parent_sku);

    ParentInfo {
        parent_sku,
        product_name,
        color,
        width: dims.width,
        drop: dims.drop,
    }
}

/// Strips dimension tokens and the resolved color from a title, collapsing
/// whitespace; an emptied title synthesizes `"Product {parent_sku}"`.
pub fn base_product_name(title: &str, color: &str, parent_sku: &str) -> String {
    let stripped = DIMENSION_TOKENS.replace_all(title, " ");
    let stripped = colors::strip_color(&stripped, color);

    let cleaned = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        format!("Product {}", parent_sku)
    } else {
        cleaned
    }
}
