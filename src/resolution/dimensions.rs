use once_cell::sync::Lazy;
use regex::Regex;

/// Width/drop measurements pulled out of free-text titles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub width: Option<i32>,
    pub drop: Option<i32>,
}

static WIDTH_X_DROP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*cm\s*x\s*(\d+)\s*cm").expect("valid regex"));

static WIDTH_DROP_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*cm\s+(\d+)\s*cm(?:\s+drop)?").expect("valid regex"));

static WIDTH_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*cm").expect("valid regex"));

static CM_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+\s*cm\b").expect("valid regex"));

/// Extracts dimensions by trying, in order: `<W>cm x <D>cm`, `<W>cm <D>cm`
/// (optionally followed by "drop"), then a bare `<W>cm`. First match wins;
/// no match yields both `None`.
pub fn extract_dimensions(title: &str) -> Dimensions {
    if let Some(caps) = WIDTH_X_DROP.captures(title) {
        return Dimensions {
            width: caps.get(1).and_then(|m| m.as_str().parse().ok()),
            drop: caps.get(2).and_then(|m| m.as_str().parse().ok()),
        };
    }
    if let Some(caps) = WIDTH_DROP_PAIR.captures(title) {
        return Dimensions {
            width: caps.get(1).and_then(|m| m.as_str().parse().ok()),
            drop: caps.get(2).and_then(|m| m.as_str().parse().ok()),
        };
    }
    if let Some(caps) = WIDTH_ONLY.captures(title) {
        return Dimensions {
            width: caps.get(1).and_then(|m| m.as_str().parse().ok()),
            drop: None,
        };
    }
    Dimensions::default()
}

/// Whether the title carries any `Ncm` token at all. Diagnostic companion to
/// [`extract_dimensions`].
pub fn has_dimension_token(title: &str) -> bool {
    CM_TOKEN.is_match(title)
}
