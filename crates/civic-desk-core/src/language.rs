//! Script-based language detection.

use serde::{Deserialize, Serialize};

/// Response language of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "mr")]
    Marathi,
}

impl Language {
    /// Short tag returned to callers (`"en"` or `"mr"`).
    pub fn tag(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Marathi => "mr",
        }
    }
}

/// Tag text containing any Devanagari character as Marathi, otherwise English.
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)) {
        Language::Marathi
    } else {
        Language::English
    }
}
