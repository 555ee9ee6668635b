use once_cell::sync::Lazy;
use regex::Regex;

/// Color used when nothing else can be resolved.
pub const DEFAULT_COLOR: &str = "Default";

/// Color vocabulary. Compound names must out-prioritize their components
/// ("dark grey" before "grey"), which the length-descending sort below
/// guarantees regardless of declaration order here.
const COLOR_NAMES: &[&str] = &[
    "dark grey",
    "light grey",
    "charcoal grey",
    "navy blue",
    "duck egg",
    "off white",
    "hot pink",
    "white",
    "black",
    "grey",
    "gray",
    "silver",
    "charcoal",
    "cream",
    "ivory",
    "natural",
    "beige",
    "taupe",
    "mink",
    "brown",
    "terracotta",
    "ochre",
    "red",
    "burgundy",
    "orange",
    "yellow",
    "mustard",
    "green",
    "sage",
    "teal",
    "aqua",
    "blue",
    "navy",
    "purple",
    "lilac",
    "pink",
    "gold",
];

static COLOR_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    let mut names: Vec<&str> = COLOR_NAMES.to_vec();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    names
        .into_iter()
        .map(|name| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(name));
            (name, Regex::new(&pattern).expect("valid regex"))
        })
        .collect()
});

/// Word immediately preceding an `Ncm` token, e.g. "White" in "White 60cm"
static WORD_BEFORE_CM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([A-Za-z]+)\s+\d+\s*cm").expect("valid regex"));

/// Resolves a color from a title: dictionary match (longest phrase first,
/// word-boundary, case-insensitive), then the word before an `Ncm` token.
/// Returns the text as it appears in the title.
pub fn color_from_title(title: &str) -> Option<String> {
    for (_, pattern) in COLOR_PATTERNS.iter() {
        if let Some(m) = pattern.find(title) {
            return Some(m.as_str().to_string());
        }
    }

    WORD_BEFORE_CM
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Removes a color (word-boundary, case-insensitive) from a text.
pub fn strip_color(text: &str, color: &str) -> String {
    if color.is_empty() || color == DEFAULT_COLOR {
        return text.to_string();
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(color));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(text, " ").into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Removes every dictionary color from a text; used when cleaning names for
/// grouping keys, where no single resolved color exists yet.
pub fn strip_all_colors(text: &str) -> String {
    let mut cleaned = text.to_string();
    for (_, pattern) in COLOR_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_color_out_prioritizes_component() {
        let color = color_from_title("Blackout Roller Blind Dark Grey 60cm x 160cm");
        assert_eq!(color.as_deref(), Some("Dark Grey"));
    }

    #[test]
    fn test_simple_dictionary_hit() {
        let color = color_from_title("Roller Blind White 60cm");
        assert_eq!(color.as_deref(), Some("White"));
    }

    #[test]
    fn test_word_boundary_required() {
        // "Goldcrest" must not match "gold"
        let color = color_from_title("Goldcrest Blind 60cm");
        // Falls through to the word-before-cm heuristic
        assert_eq!(color.as_deref(), Some("Blind"));
    }

    #[test]
    fn test_word_before_cm_fallback() {
        let color = color_from_title("Roller Blind Truffle 60cm");
        assert_eq!(color.as_deref(), Some("Truffle"));
    }

    #[test]
    fn test_no_resolution() {
        assert_eq!(color_from_title("Curtain Tie Back"), None);
    }

    #[test]
    fn test_strip_color() {
        let stripped = strip_color("Roller Blind Dark Grey", "Dark Grey");
        assert_eq!(stripped.split_whitespace().collect::<Vec<_>>(), vec!["Roller", "Blind"]);
    }

    #[test]
    fn test_strip_color_ignores_default() {
        assert_eq!(strip_color("Roller Blind", DEFAULT_COLOR), "Roller Blind");
    }

    #[test]
    fn test_strip_all_colors() {
        let stripped = strip_all_colors("Roller Blind Dark Grey White");
        assert_eq!(stripped.split_whitespace().collect::<Vec<_>>(), vec!["Roller", "Blind"]);
    }
}
