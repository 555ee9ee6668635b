use crate::models::ColumnMapping;

/// Static vocabulary of canonical fields and the header spellings that map
/// to them. Declaration order is a deliberate priority tie-break: the first
/// field to satisfy any rule wins, so the more specific parent_* entries
/// must sit above the generic sku/name ones.
const FIELD_VOCABULARY: &[(&str, &[&str])] = &[
    ("parent_sku", &["parent sku", "parent code", "parent product code"]),
    ("parent_name", &["parent name", "parent product name", "parent title"]),
    (
        "sku",
        &["sku", "sku code", "product code", "item code", "variant sku", "article number"],
    ),
    (
        "product_name",
        &["product name", "name", "title", "item name", "product title"],
    ),
    (
        "description",
        &["description", "product description", "long description"],
    ),
    ("barcode", &["barcode", "ean", "upc", "gtin", "ean code"]),
    (
        "price",
        &["price", "retail price", "rrp", "unit price", "selling price"],
    ),
    (
        "stock_level",
        &["stock", "stock level", "quantity", "qty", "stock quantity"],
    ),
    ("color", &["colour", "color"]),
    ("width", &["width", "width cm"]),
    ("drop", &["drop", "drop cm", "length cm"]),
    ("brand", &["brand", "manufacturer"]),
    ("category", &["category", "product category", "product type"]),
    ("image_urls", &["image urls", "image url", "images", "image"]),
];

/// Minimum share of pattern words that must fuzzy-match a header word
const FUZZY_WORD_RATIO: f64 = 0.7;

/// Guesses canonical field names for arbitrary column headers.
pub struct FieldMapper;

impl FieldMapper {
    /// Returns the canonical field for a header, or `None` when nothing in
    /// the vocabulary matches. An exact pass over the whole vocabulary runs
    /// first so a short header like "SKU" is claimed by its own entry before
    /// the looser rules fire. The second pass accepts containment in either
    /// direction ("Url" inside "image urls") and bounded fuzzy word matching,
    /// with vocabulary order as the tie-break.
    pub fn guess_field(header: &str) -> Option<&'static str> {
        let normalized = normalize_header(header);
        if normalized.is_empty() {
            return None;
        }
        let header_words: Vec<&str> = normalized.split(' ').collect();

        for (field, patterns) in FIELD_VOCABULARY {
            if patterns.iter().any(|pattern| normalized == *pattern) {
                return Some(field);
            }
        }
        for (field, patterns) in FIELD_VOCABULARY {
            for pattern in *patterns {
                if normalized.contains(pattern)
                    || pattern.contains(&normalized)
                    || fuzzy_match(pattern, &header_words)
                {
                    return Some(field);
                }
            }
        }
        None
    }

    /// Builds a header-keyed mapping by guessing every header; the first
    /// header claiming a field wins.
    pub fn guess_mapping(headers: &[String]) -> ColumnMapping {
        let mut mapping = ColumnMapping::new();
        let mut claimed: Vec<&str> = Vec::new();

        for header in headers {
            if let Some(field) = Self::guess_field(header) {
                if !claimed.contains(&field) {
                    claimed.push(field);
                    mapping.insert(field, header.as_str());
                }
            }
        }
        mapping
    }
}

/// Lowercases, maps non-alphanumerics to spaces and collapses whitespace.
pub fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when at least [`FUZZY_WORD_RATIO`] of the pattern's words have some
/// header word within edit distance 1.
fn fuzzy_match(pattern: &str, header_words: &[&str]) -> bool {
    let pattern_words: Vec<&str> = pattern.split(' ').collect();
    let matched = pattern_words
        .iter()
        .filter(|pw| header_words.iter().any(|hw| edit_distance(pw, hw) <= 1))
        .count();

    matched as f64 / pattern_words.len() as f64 >= FUZZY_WORD_RATIO
}

/// Levenshtein distance between two words.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}
