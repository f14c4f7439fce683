//! Intent patterns used by the resolution cascade.
//!
//! Patterns are matched on whole tokens of the folded query (see
//! [`crate::query::fold`]). A Devanagari pattern word also matches the word
//! followed by one of a closed list of case suffixes, since Marathi attaches
//! them directly to the word.

use crate::query::fold;

const FOLLOW_UP_PHRASES: &[&str] = &[
    "tell me more",
    "what is it about",
    "what does it say",
    "more details",
    "more information",
    "more info",
    "in short",
    "date",
    "dated",
    "when",
    "summary",
    "summarize",
    "summarise",
    "summarized",
    "brief",
    "briefly",
    "explain",
    "explanation",
    "elaborate",
    "details",
    "detail",
    "more",
    "तारीख",
    "दिनांक",
    "कधी",
    "सारांश",
    "थोडक्यात",
    "स्पष्ट",
    "समजावून",
    "अधिक",
    "आणखी",
    "तपशील",
];

const LATEST_PHRASES: &[&str] = &[
    "most recent",
    "what s new",
    "whats new",
    "new circulars",
    "new circular",
    "latest",
    "newest",
    "नवीनतम",
    "नवीन",
    "ताजे",
    "ताजी",
    "अलीकडील",
    "अलीकडचे",
];

const MARATHI_SUFFIXES: &[&str] = &[
    "ची", "चे", "चा", "च्या", "ला", "ना", "ने", "नी", "त", "मध्ये", "वर", "ही", "च", "तम", "वार",
];

fn word_matches(token: &str, word: &str) -> bool {
    if token == word {
        return true;
    }
    if word.is_ascii() {
        return false;
    }
    token
        .strip_prefix(word)
        .is_some_and(|rest| MARATHI_SUFFIXES.contains(&rest))
}

fn contains_phrase(tokens: &[&str], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split(' ').collect();
    if words.len() > tokens.len() {
        return false;
    }
    tokens.windows(words.len()).any(|window| {
        window
            .iter()
            .zip(words.iter())
            .all(|(token, word)| word_matches(token, word))
    })
}

fn matches_any(query: &str, phrases: &[&str]) -> bool {
    let folded = fold(query);
    let tokens: Vec<&str> = folded.split(' ').filter(|t| !t.is_empty()).collect();
    phrases.iter().any(|p| contains_phrase(&tokens, p))
}

/// True when the query asks to continue with the previously discussed
/// document: its date, a summary, an explanation, or more detail.
pub fn is_follow_up(query: &str) -> bool {
    matches_any(query, FOLLOW_UP_PHRASES)
}

/// True when the query asks for the newest document.
pub fn is_latest(query: &str) -> bool {
    matches_any(query, LATEST_PHRASES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_up_english() {
        assert!(is_follow_up("tell me more"));
        assert!(is_follow_up("What is the date of this?"));
        assert!(is_follow_up("Can you summarize it"));
        assert!(is_follow_up("please explain"));
        assert!(!is_follow_up("property tax circular"));
        // Substrings of longer words do not count.
        assert!(!is_follow_up("update on moreshwar road"));
    }

    #[test]
    fn test_follow_up_marathi() {
        assert!(is_follow_up("याची तारीख काय आहे?"));
        assert!(is_follow_up("थोडक्यात सांगा"));
        assert!(is_follow_up("तपशीलवार माहिती द्या"));
        assert!(!is_follow_up("पाणीपुरवठा परिपत्रक"));
    }

    #[test]
    fn test_marathi_words_sharing_a_prefix_do_not_match() {
        assert!(!is_follow_up("माहिती अधिकार अधिनियम"));
        assert!(!is_follow_up("क्षेत्रीय अधिकारी यादी"));
        assert!(!is_latest("परवाना नवीनीकरण"));
        assert!(is_follow_up("अधिकची माहिती"));
        assert!(is_latest("नवीनच परिपत्रक"));
    }

    #[test]
    fn test_latest_patterns() {
        assert!(is_latest("latest circular"));
        assert!(is_latest("What's new?"));
        assert!(is_latest("show the most recent notice"));
        assert!(is_latest("नवीनतम परिपत्रक"));
        assert!(!is_latest("circular about newer roads"));
        assert!(!is_latest("SAP Sasa-40 Training Workshop"));
        assert!(!is_latest("Is there any recent circular about the Water Tax?"));
    }
}
