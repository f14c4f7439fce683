//! Query normalization and literal text confirmation.
//!
//! The normalized form of a query is used for matching only, never for
//! display:
//!
//! 1. lowercase,
//! 2. punctuation replaced by spaces,
//! 3. whitespace collapsed,
//! 4. generic request phrases ("give me", "please", "the", …) removed on
//!    token boundaries, repeated until nothing more can be removed.
//!
//! Step 4 runs to a fixed point, so [`normalize`] is idempotent.

use crate::models::Document;

/// Generic request phrases that carry no topical meaning.
///
/// Longer phrases come before their prefixes so that "is there any" wins
/// over "is there".
const STOP_PHRASES: &[&str] = &[
    "is there any",
    "are there any",
    "is there",
    "are there",
    "i would like",
    "tell me about",
    "can you",
    "could you",
    "would you",
    "give me",
    "show me",
    "i want",
    "i need",
    "please",
    "kindly",
    "recent",
    "the",
    "a",
    "an",
    "any",
    "आहे का",
    "कृपया",
    "मला",
    "द्या",
    "सांगा",
    "काही",
];

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '।' | '॥' | '‘' | '’' | '“' | '”' | '–' | '—' | '…' | '«' | '»' | '•' | '·'
        )
}

/// Lowercase, strip punctuation and collapse whitespace.
///
/// Letters and combining marks of every script are kept, so Devanagari
/// words survive intact.
pub fn fold(text: &str) -> String {
    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| if is_punctuation(c) { ' ' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_stop_phrases_once<'a>(tokens: &[&'a str]) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    'tokens: while i < tokens.len() {
        for phrase in STOP_PHRASES {
            let words: Vec<&str> = phrase.split(' ').collect();
            if tokens[i..].starts_with(&words) {
                i += words.len();
                continue 'tokens;
            }
        }
        out.push(tokens[i]);
        i += 1;
    }
    out
}

/// Normalize a query for matching. See the module docs for the steps.
pub fn normalize(text: &str) -> String {
    let folded = fold(text);
    let mut tokens: Vec<&str> = folded.split(' ').filter(|t| !t.is_empty()).collect();
    loop {
        let next = strip_stop_phrases_once(&tokens);
        if next.len() == tokens.len() {
            break;
        }
        tokens = next;
    }
    tokens.join(" ")
}

/// True when `haystack` contains the normalized query.
///
/// Matches either the lowercased raw text or its normalized form, so that
/// punctuation and filler words in the stored text do not hide a match.
/// An empty query never matches.
pub fn text_contains(haystack: &str, normalized_query: &str) -> bool {
    if normalized_query.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(normalized_query)
        || normalize(haystack).contains(normalized_query)
}

/// True when the document's title or body contains the normalized query.
pub fn document_contains(doc: &Document, normalized_query: &str) -> bool {
    text_contains(&doc.title, normalized_query) || text_contains(&doc.body, normalized_query)
}
