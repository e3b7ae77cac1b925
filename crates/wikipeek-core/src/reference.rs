//! Bracketed reference extraction and title normalization.
//!
//! `[[name]]` and `[name]` are equivalent markers; a leading `!` inside
//! the brackets means "use the text verbatim, skip title-casing".


use once_cell::sync::Lazy;
use regex::Regex;

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([^\[\]]*)\]\]|\[([^\[\]]*)\]").expect("reference pattern is valid")
});

/// Words kept lower-case by the title normalizer, except at position 0.
const EXCLUDED_WORDS: &[&str] = &["of", "and", "the", "to", "at", "for", "league"];

/// One bracketed mention parsed out of a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Text between the bracket delimiters, literal escape stripped.
    pub raw_text: String,
    /// True when the text was prefixed with `!`.
    pub is_literal: bool,
}

impl Reference {
    /// Canonical display title used to build the lookup URL.
    pub fn resolved_title(&self) -> String {
        if self.is_literal {
            self.raw_text.clone()
        } else {
            title_case(&self.raw_text)
        }
    }
}

/// A concrete page lookup derived from a resolved title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTarget {
    pub title: String,
    /// Absolute URL: configured base plus the path-safe title.
    pub url: String,
}

impl LookupTarget {
    pub fn new(base_url: &str, title: &str) -> Self {
        let url_path = title.replace(' ', "_");
        Self {
            title: title.to_string(),
            url: format!("{base_url}{url_path}"),
        }
    }
}

/// Yield one [`Reference`] per non-overlapping bracket match, in scan
/// order. Empty matches (`[]`) are reproduced as-is, not filtered.
pub fn extract_references(text: &str) -> impl Iterator<Item = Reference> + '_ {
    REFERENCE_RE.captures_iter(text).map(|caps| {
        // Whichever bracket form matched supplies the raw text.
        let raw = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();

        match raw.strip_prefix('!') {
            Some(stripped) => Reference {
                raw_text: stripped.to_string(),
                is_literal: true,
            },
            None => Reference {
                raw_text: raw.to_string(),
                is_literal: false,
            },
        }
    })
}

/// English title-casing for the wiki's page-naming scheme.
///
/// The whole string is lower-cased first, then the first letter of every
/// word is capitalized — except words from the exclusion set, which stay
/// lower-case anywhere but position 0.
pub fn title_case(input: &str) -> String {
    let lowered = input.to_lowercase();
    lowered
        .split(' ')
        .enumerate()
        .map(|(index, word)| {
            if index > 0 && EXCLUDED_WORDS.contains(&word) {
                word.to_string()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
