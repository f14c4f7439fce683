//! Core data models used throughout Civic Desk.
//!
//! These types represent the stored documents, the metadata kept next to
//! each vector, the conversation turns echoed back by callers, and the
//! outcome of context resolution.

use serde::{Deserialize, Deserializer, Serialize};

use crate::links::first_link;

/// A stored informational document (circular, act, notice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Source identifier (`nid` in the site's listing API).
    pub id: String,
    pub title: String,
    pub body: String,
    /// Publish date as published, normally `"DD Month YYYY"`.
    pub display_date: Option<String>,
    /// File or external link, possibly site-relative.
    pub link: Option<String>,
    /// Content type tag, e.g. `"circular"` or `"rti_act"`.
    pub content_type: String,
}

impl Document {
    /// True when the document carries a non-empty link.
    pub fn has_link(&self) -> bool {
        self.link.as_deref().is_some_and(|l| !l.trim().is_empty())
    }

    /// Text that gets embedded for this document: title, body, then link.
    pub fn embedding_text(&self) -> String {
        let mut text = format!("{}\n{}", self.title, self.body);
        if let Some(link) = self.link.as_deref().filter(|l| !l.trim().is_empty()) {
            text.push('\n');
            text.push_str(link);
        }
        text
    }

    /// First `max_chars` characters of the body, whitespace-collapsed.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let collapsed = self.body.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() <= max_chars {
            return collapsed;
        }
        let mut cut: String = collapsed.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}

/// Metadata stored alongside each vector in the index.
///
/// Every field is optional so that vectors written by older ingestion runs
/// (which only stored `text` and `content_type`) still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub nid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl IndexMetadata {
    /// Build the metadata written for a document at indexing time.
    pub fn from_document(doc: &Document) -> Self {
        Self {
            nid: Some(doc.id.clone()),
            title: Some(doc.title.clone()),
            text: Some(format!("{}\n{}", doc.title, doc.body)),
            display_date: doc.display_date.clone(),
            file: None,
            url: None,
            link: doc.link.clone(),
            external_link: None,
            content_type: Some(doc.content_type.clone()),
        }
    }

    /// Reconstruct a [`Document`] from stored metadata.
    ///
    /// `fallback_id` is the vector id, used when no `nid` was stored.
    pub fn to_document(&self, fallback_id: &str) -> Document {
        let title = self.title.clone().unwrap_or_default();
        let text = self.text.clone().unwrap_or_default();
        // `text` is "title\nbody" for fully indexed records.
        let body = match text.strip_prefix(title.as_str()) {
            Some(rest) if !title.is_empty() => rest.trim_start_matches('\n').to_string(),
            _ => text,
        };
        Document {
            id: self.nid.clone().unwrap_or_else(|| fallback_id.to_string()),
            title,
            body,
            display_date: self.display_date.clone(),
            link: first_link(&[
                self.file.as_deref(),
                self.url.as_deref(),
                self.link.as_deref(),
                self.external_link.as_deref(),
            ]),
            content_type: self.content_type.clone().unwrap_or_default(),
        }
    }
}

/// A raw nearest-neighbour hit returned by a vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    pub metadata: IndexMetadata,
}

/// An index hit converted into a document, with its absolute URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedMatch {
    pub document: Document,
    pub score: f32,
    pub url: Option<String>,
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn of the conversation, echoed back by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    /// Document this turn was answered from, if any.
    #[serde(default, alias = "circular_id", deserialize_with = "string_or_number")]
    pub document_id: Option<String>,
}

/// Which cascade rule produced a [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    Continuation,
    Latest,
    TextMatch,
    VectorRank,
    StoreScan,
    Unresolved,
}

/// Outcome of context resolution for one request.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The single grounding document, if any.
    pub document: Option<Document>,
    pub resolved_by: ResolvedBy,
    /// Ranked index hits, kept for transparency. Empty when similarity
    /// search was not performed.
    pub matches: Vec<RetrievedMatch>,
}

impl Resolution {
    pub fn unresolved() -> Self {
        Self {
            document: None,
            resolved_by: ResolvedBy::Unresolved,
            matches: Vec::new(),
        }
    }

    /// True when the document was confirmed by a literal text match.
    pub fn is_text_confirmed(&self) -> bool {
        matches!(
            self.resolved_by,
            ResolvedBy::TextMatch | ResolvedBy::StoreScan
        )
    }
}

/// Accept an identifier written either as a JSON string or a number.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
