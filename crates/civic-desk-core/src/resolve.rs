//! Context resolution: choosing the one document that grounds an answer.
//!
//! [`ContextResolver::resolve`] runs a fixed priority cascade; the first
//! rule that produces a document wins.
//!
//! | # | Rule | Trigger | Source |
//! |---|------|---------|--------|
//! | 1 | Continuation | a referenced document + follow-up intent | store lookup by id |
//! | 2 | Latest | "latest / newest / what's new" intent | store, sorted by date |
//! | 3a | Text match | first index hit containing the query | vector index |
//! | 3b | Vector rank | top index hit | vector index |
//! | 3c | Store scan | top hit not textually confirmed | full store scan |
//!
//! Rule 2 is terminal: a latest-intent query never falls through to
//! similarity search. Collaborator failures are logged and only disable the
//! step they occur in, so `resolve` itself cannot fail.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::index::VectorIndex;
use crate::intent::{is_follow_up, is_latest};
use crate::links::absolute_url;
use crate::models::{ConversationTurn, Document, Resolution, ResolvedBy, RetrievedMatch, Role};
use crate::query::{document_contains, normalize};
use crate::store::DocumentStore;

/// Publish date format used by the site, e.g. `"15 March 2024"`.
pub const DISPLAY_DATE_FORMAT: &str = "%d %B %Y";

/// Tuning parameters for the resolver.
#[derive(Debug, Clone)]
pub struct ResolverParams {
    /// Number of nearest neighbours fetched from the index.
    pub top_k: usize,
    /// Base URL that relative document links are joined onto.
    pub site_base_url: String,
}

impl Default for ResolverParams {
    fn default() -> Self {
        Self {
            top_k: 10,
            site_base_url: String::new(),
        }
    }
}

/// Inputs for a single resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    /// The raw user question.
    pub query: &'a str,
    /// Prior turns, oldest first.
    pub history: &'a [ConversationTurn],
    /// Explicit hint from the caller; overrides history inspection.
    pub last_document_id: Option<&'a str>,
}

/// Runs the resolution cascade against injected collaborators.
pub struct ContextResolver {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn DocumentStore>,
    params: ResolverParams,
}

impl ContextResolver {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn DocumentStore>,
        params: ResolverParams,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
            params,
        }
    }

    /// Resolve the grounding document for a request.
    pub async fn resolve(&self, req: &ResolveRequest<'_>) -> Resolution {
        if let Some(reference) = referenced_document_id(req) {
            if is_follow_up(req.query) {
                if let Some(doc) = self.lookup(reference).await {
                    debug!(id = %doc.id, "resolved by continuation");
                    return Resolution {
                        document: Some(doc),
                        resolved_by: ResolvedBy::Continuation,
                        matches: Vec::new(),
                    };
                }
            }
        }

        if is_latest(req.query) {
            return self.resolve_latest().await;
        }

        let normalized = normalize(req.query);
        self.resolve_by_similarity(req.query, &normalized).await
    }

    /// Embed `text` and fetch the top-K index hits as documents.
    ///
    /// Returns an empty list when the embedder or the index fails.
    pub async fn similar(&self, text: &str) -> Vec<RetrievedMatch> {
        let vector = match embed_query(self.embedder.as_ref(), text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, model = self.embedder.model_name(), "query embedding failed");
                return Vec::new();
            }
        };
        let hits = match self.index.query(&vector, self.params.top_k).await {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, backend = self.index.backend(), "vector index query failed");
                return Vec::new();
            }
        };
        hits.into_iter()
            .map(|hit| {
                let document = hit.metadata.to_document(&hit.id);
                let url = document
                    .link
                    .as_deref()
                    .and_then(|l| absolute_url(&self.params.site_base_url, l));
                RetrievedMatch {
                    document,
                    score: hit.score,
                    url,
                }
            })
            .collect()
    }

    async fn lookup(&self, id: &str) -> Option<Document> {
        match self.store.find(id).await {
            Ok(Some(doc)) => Some(doc),
            Ok(None) => {
                debug!(id, "referenced document not in store");
                None
            }
            Err(e) => {
                warn!(error = %e, id, "document store lookup failed");
                None
            }
        }
    }

    async fn resolve_latest(&self) -> Resolution {
        let docs = match self.store.load_all().await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "document store load failed during latest lookup");
                return Resolution::unresolved();
            }
        };
        match latest_linked_document(docs) {
            Some(doc) => {
                debug!(id = %doc.id, date = ?doc.display_date, "resolved by latest");
                Resolution {
                    document: Some(doc),
                    resolved_by: ResolvedBy::Latest,
                    matches: Vec::new(),
                }
            }
            None => Resolution::unresolved(),
        }
    }

    async fn resolve_by_similarity(&self, raw_query: &str, normalized: &str) -> Resolution {
        let embed_text = if normalized.is_empty() {
            raw_query.trim()
        } else {
            normalized
        };
        let matches = self.similar(embed_text).await;

        if let Some(hit) = matches
            .iter()
            .find(|m| document_contains(&m.document, normalized))
        {
            debug!(id = %hit.document.id, score = hit.score, "resolved by text match");
            return Resolution {
                document: Some(hit.document.clone()),
                resolved_by: ResolvedBy::TextMatch,
                matches,
            };
        }

        if let Some(doc) = self.scan_store(normalized).await {
            debug!(id = %doc.id, "resolved by store scan");
            return Resolution {
                document: Some(doc),
                resolved_by: ResolvedBy::StoreScan,
                matches,
            };
        }

        match matches.first() {
            Some(top) => {
                debug!(id = %top.document.id, score = top.score, "resolved by vector rank");
                Resolution {
                    document: Some(top.document.clone()),
                    resolved_by: ResolvedBy::VectorRank,
                    matches,
                }
            }
            None => Resolution {
                document: None,
                resolved_by: ResolvedBy::Unresolved,
                matches,
            },
        }
    }

    async fn scan_store(&self, normalized: &str) -> Option<Document> {
        if normalized.is_empty() {
            return None;
        }
        match self.store.load_all().await {
            Ok(docs) => docs
                .into_iter()
                .find(|d| document_contains(d, normalized)),
            Err(e) => {
                warn!(error = %e, "document store load failed during fallback scan");
                None
            }
        }
    }
}

/// The document a follow-up would refer to.
///
/// An explicit, non-blank `last_document_id` wins. Otherwise the most
/// recent assistant turn is consulted; if it carries no reference there is
/// nothing to continue.
pub fn referenced_document_id<'a>(req: &ResolveRequest<'a>) -> Option<&'a str> {
    if let Some(id) = req.last_document_id.map(str::trim).filter(|s| !s.is_empty()) {
        return Some(id);
    }
    req.history
        .iter()
        .rev()
        .find(|t| t.role == Role::Assistant)
        .and_then(|t| t.document_id.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parse a `"DD Month YYYY"` publish date.
pub fn parse_display_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DISPLAY_DATE_FORMAT).ok()
}

/// Newest document that has a link.
///
/// Missing or unparsable dates sort as the earliest possible date. The sort
/// is stable, so among equal dates store order decides.
pub fn latest_linked_document(docs: Vec<Document>) -> Option<Document> {
    let mut dated: Vec<(NaiveDate, Document)> = docs
        .into_iter()
        .map(|d| {
            let date = d
                .display_date
                .as_deref()
                .and_then(parse_display_date)
                .unwrap_or(NaiveDate::MIN);
            (date, d)
        })
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    dated.into_iter().map(|(_, d)| d).find(Document::has_link)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntry;
    use crate::models::{IndexMatch, IndexMetadata};
    use crate::store::memory::InMemoryDocumentStore;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ─── Fakes ──────────────────────────────────────────────────────

    #[derive(Default)]
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            1
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("embedding service unreachable");
            }
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
    }

    /// Returns a fixed ranked list regardless of the query vector.
    #[derive(Default)]
    struct ScriptedIndex {
        hits: Vec<IndexMatch>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl VectorIndex for ScriptedIndex {
        fn backend(&self) -> &str {
            "scripted"
        }
        async fn upsert(&self, _entries: &[IndexEntry]) -> Result<()> {
            Ok(())
        }
        async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("index connection reset");
            }
            Ok(self.hits.iter().take(top_k).cloned().collect())
        }
        async fn existing_ids(&self, _ids: &[String]) -> Result<HashSet<String>> {
            Ok(HashSet::new())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn load_all(&self) -> Result<Vec<Document>> {
            bail!("store file unreadable")
        }
    }

    fn doc(id: &str, title: &str, body: &str, date: Option<&str>, link: Option<&str>) -> Document {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            display_date: date.map(str::to_string),
            link: link.map(str::to_string),
            content_type: "circular".to_string(),
        }
    }

    fn hit(d: &Document, score: f32) -> IndexMatch {
        IndexMatch {
            id: d.id.clone(),
            score,
            metadata: IndexMetadata::from_document(d),
        }
    }

    struct Harness {
        embedder: Arc<CountingEmbedder>,
        index: Arc<ScriptedIndex>,
        resolver: ContextResolver,
    }

    fn harness(
        embedder: CountingEmbedder,
        hits: Vec<IndexMatch>,
        store: Arc<dyn DocumentStore>,
    ) -> Harness {
        let embedder = Arc::new(embedder);
        let index = Arc::new(ScriptedIndex {
            hits,
            ..Default::default()
        });
        let resolver = ContextResolver::new(
            embedder.clone(),
            index.clone(),
            store,
            ResolverParams {
                top_k: 10,
                site_base_url: "https://www.pmc.gov.in".to_string(),
            },
        );
        Harness {
            embedder,
            index,
            resolver,
        }
    }

    fn request<'a>(query: &'a str, history: &'a [ConversationTurn]) -> ResolveRequest<'a> {
        ResolveRequest {
            query,
            history,
            last_document_id: None,
        }
    }

    fn assistant_turn(id: Option<&str>) -> ConversationTurn {
        ConversationTurn {
            role: Role::Assistant,
            content: "Here is the circular.".to_string(),
            document_id: id.map(str::to_string),
        }
    }

    // ─── Latest ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_latest_prefers_newest_linked_document() {
        let store = InMemoryDocumentStore::new(vec![
            doc("1", "January notice", "", Some("01 January 2024"), None),
            doc("2", "March notice", "", Some("15 March 2024"), Some("/m.pdf")),
        ]);
        let h = harness(CountingEmbedder::default(), Vec::new(), Arc::new(store));

        let res = h.resolver.resolve(&request("latest circular", &[])).await;
        assert_eq!(res.document.unwrap().id, "2");
        assert_eq!(res.resolved_by, ResolvedBy::Latest);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.index.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_latest_is_max_date_among_linked() {
        let docs = vec![
            doc("a", "", "", Some("05 February 2023"), Some("/a")),
            doc("b", "", "", Some("not a date"), Some("/b")),
            doc("c", "", "", Some("20 December 2024"), None),
            doc("d", "", "", Some("11 November 2024"), Some("/d")),
            doc("e", "", "", None, Some("/e")),
            doc("f", "", "", Some("11 November 2024"), Some("/f")),
        ];
        let latest = latest_linked_document(docs).unwrap();
        // "d" and "f" share the max linked date; store order breaks the tie.
        assert_eq!(latest.id, "d");
    }

    #[test]
    fn test_latest_with_only_undated_links_returns_first_linked() {
        let docs = vec![
            doc("a", "", "", None, None),
            doc("b", "", "", Some("garbage"), Some("/b")),
            doc("c", "", "", None, Some("/c")),
        ];
        assert_eq!(latest_linked_document(docs).unwrap().id, "b");
    }

    #[tokio::test]
    async fn test_latest_without_linked_documents_is_unresolved() {
        let store = InMemoryDocumentStore::new(vec![doc("1", "t", "", Some("01 May 2024"), None)]);
        let h = harness(CountingEmbedder::default(), Vec::new(), Arc::new(store));
        let res = h.resolver.resolve(&request("what's new", &[])).await;
        assert!(res.document.is_none());
        assert_eq!(h.index.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_latest_store_failure_degrades_to_none() {
        let h = harness(CountingEmbedder::default(), Vec::new(), Arc::new(BrokenStore));
        let res = h.resolver.resolve(&request("newest notice", &[])).await;
        assert!(res.document.is_none());
        assert_eq!(res.resolved_by, ResolvedBy::Unresolved);
    }

    // ─── Similarity ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_text_match_beats_vector_rank() {
        let top = doc("10", "Training calendar", "General schedule", None, None);
        let exact = doc(
            "11",
            "Circular",
            "Regarding SAP Sasa-40 Training Workshop for clerks",
            Some("02 April 2024"),
            Some("/sap.pdf"),
        );
        let store = InMemoryDocumentStore::new(vec![top.clone(), exact.clone()]);
        let h = harness(
            CountingEmbedder::default(),
            vec![hit(&top, 0.92), hit(&exact, 0.41)],
            Arc::new(store),
        );

        let res = h
            .resolver
            .resolve(&request("SAP Sasa-40 Training Workshop", &[]))
            .await;
        assert_eq!(res.document.as_ref().unwrap().id, "11");
        assert_eq!(res.resolved_by, ResolvedBy::TextMatch);
        assert_eq!(res.matches.len(), 2);
        assert_eq!(
            res.matches[1].url.as_deref(),
            Some("https://www.pmc.gov.in/sap.pdf")
        );
    }

    #[tokio::test]
    async fn test_store_scan_rescues_unconfirmed_vector_match() {
        let top = doc("10", "Training calendar", "General schedule", None, None);
        let exact = doc("99", "SAP Sasa-40 Training Workshop", "", None, Some("/sap.pdf"));
        let store = InMemoryDocumentStore::new(vec![top.clone(), exact]);
        let h = harness(
            CountingEmbedder::default(),
            vec![hit(&top, 0.92)],
            Arc::new(store),
        );

        let res = h
            .resolver
            .resolve(&request("sap sasa-40 training workshop", &[]))
            .await;
        assert_eq!(res.document.unwrap().id, "99");
        assert_eq!(res.resolved_by, ResolvedBy::StoreScan);
    }

    #[tokio::test]
    async fn test_top_vector_match_when_nothing_confirms() {
        let top = doc("10", "Garden maintenance", "Parks department", None, Some("/g.pdf"));
        let second = doc("12", "Road works", "Ward 4", None, None);
        let store = InMemoryDocumentStore::new(vec![second.clone()]);
        let h = harness(
            CountingEmbedder::default(),
            vec![hit(&top, 0.8), hit(&second, 0.6)],
            Arc::new(store),
        );

        let res = h.resolver.resolve(&request("tree trimming", &[])).await;
        assert_eq!(res.document.unwrap().id, "10");
        assert_eq!(res.resolved_by, ResolvedBy::VectorRank);
    }

    #[tokio::test]
    async fn test_never_returns_non_containing_document_when_one_contains() {
        let decoys: Vec<Document> = (0..5)
            .map(|i| doc(&format!("d{}", i), "Budget", "Annual figures", None, None))
            .collect();
        let target = doc("t", "Notice", "The hawker zone survey starts Monday", None, None);
        let mut all = decoys.clone();
        all.push(target);
        let hits = decoys.iter().map(|d| hit(d, 0.9)).collect();
        let h = harness(
            CountingEmbedder::default(),
            hits,
            Arc::new(InMemoryDocumentStore::new(all)),
        );

        let res = h.resolver.resolve(&request("Hawker Zone survey", &[])).await;
        let resolved = res.document.unwrap();
        assert!(document_contains(&resolved, &normalize("Hawker Zone survey")));
        assert_eq!(resolved.id, "t");
    }

    #[tokio::test]
    async fn test_embedding_failure_still_scans_store() {
        let target = doc("7", "Property tax rebate", "", None, None);
        let h = harness(
            CountingEmbedder {
                fail: true,
                ..Default::default()
            },
            Vec::new(),
            Arc::new(InMemoryDocumentStore::new(vec![target])),
        );

        let res = h.resolver.resolve(&request("property tax rebate", &[])).await;
        assert_eq!(res.document.unwrap().id, "7");
        assert!(res.matches.is_empty());
        assert_eq!(h.index.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_index_failure_still_scans_store() {
        let target = doc("7", "Property tax rebate", "", None, None);
        let embedder = Arc::new(CountingEmbedder::default());
        let index = Arc::new(ScriptedIndex {
            hits: vec![hit(&target, 0.9)],
            fail: true,
            ..Default::default()
        });
        let resolver = ContextResolver::new(
            embedder.clone(),
            index.clone(),
            Arc::new(InMemoryDocumentStore::new(vec![target])),
            ResolverParams::default(),
        );

        let res = resolver.resolve(&request("property tax rebate", &[])).await;
        assert_eq!(res.document.unwrap().id, "7");
        assert_eq!(res.resolved_by, ResolvedBy::StoreScan);
        assert!(res.matches.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(index.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_marathi_renewal_query_is_not_a_latest_request() {
        let renewal = doc("1", "परवाना नवीनीकरण अर्ज", "", Some("01 January 2024"), None);
        let newer = doc("2", "मालमत्ता कर सवलत", "", Some("15 March 2024"), Some("/tax.pdf"));
        let h = harness(
            CountingEmbedder::default(),
            vec![hit(&newer, 0.9)],
            Arc::new(InMemoryDocumentStore::new(vec![renewal, newer.clone()])),
        );

        let res = h.resolver.resolve(&request("परवाना नवीनीकरण", &[])).await;
        assert_eq!(res.document.unwrap().id, "1");
        assert_eq!(res.resolved_by, ResolvedBy::StoreScan);
    }

    #[tokio::test]
    async fn test_rti_question_after_an_answer_is_not_a_follow_up() {
        let previous = doc("5", "पाणीपुरवठा बंद", "", None, None);
        let rti = doc("9", "माहिती अधिकार अधिनियम", "", None, Some("/rti.pdf"));
        let h = harness(
            CountingEmbedder::default(),
            vec![hit(&rti, 0.9)],
            Arc::new(InMemoryDocumentStore::new(vec![previous, rti.clone()])),
        );
        let history = vec![assistant_turn(Some("5"))];

        let res = h
            .resolver
            .resolve(&request("माहिती अधिकार अधिनियम", &history))
            .await;
        assert_eq!(res.document.unwrap().id, "9");
        assert_eq!(res.resolved_by, ResolvedBy::TextMatch);
    }

    #[tokio::test]
    async fn test_recent_topic_query_uses_similarity() {
        let newest = doc("1", "Garden maintenance", "", Some("20 May 2024"), Some("/g.pdf"));
        let water = doc(
            "2",
            "Circular about water tax revision",
            "",
            Some("01 January 2023"),
            Some("/w.pdf"),
        );
        let h = harness(
            CountingEmbedder::default(),
            vec![hit(&newest, 0.8)],
            Arc::new(InMemoryDocumentStore::new(vec![newest.clone(), water])),
        );

        let res = h
            .resolver
            .resolve(&request("Is there any recent circular about the Water Tax?", &[]))
            .await;
        assert_eq!(res.document.unwrap().id, "2");
        assert_eq!(res.resolved_by, ResolvedBy::StoreScan);
        assert_eq!(h.index.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_store_and_no_matches_is_unresolved() {
        let h = harness(
            CountingEmbedder::default(),
            Vec::new(),
            Arc::new(InMemoryDocumentStore::default()),
        );
        let res = h.resolver.resolve(&request("drainage complaint", &[])).await;
        assert!(res.document.is_none());
        assert_eq!(res.resolved_by, ResolvedBy::Unresolved);
    }

    // ─── Continuation ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_follow_up_resolves_to_previous_document_without_search() {
        let referenced = doc("123", "Ward office timings", "", None, None);
        let other = doc("5", "Tell me more about festivals", "", None, None);
        let h = harness(
            CountingEmbedder::default(),
            vec![hit(&other, 0.99)],
            Arc::new(InMemoryDocumentStore::new(vec![other.clone(), referenced])),
        );
        let history = vec![
            ConversationTurn {
                role: Role::User,
                content: "ward office timings".to_string(),
                document_id: None,
            },
            assistant_turn(Some("123")),
        ];

        let res = h.resolver.resolve(&request("tell me more", &history)).await;
        assert_eq!(res.document.unwrap().id, "123");
        assert_eq!(res.resolved_by, ResolvedBy::Continuation);
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.index.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_explicit_last_document_id_overrides_history() {
        let store = InMemoryDocumentStore::new(vec![
            doc("1", "First", "", None, None),
            doc("2", "Second", "", None, None),
        ]);
        let h = harness(CountingEmbedder::default(), Vec::new(), Arc::new(store));
        let history = vec![assistant_turn(Some("1"))];
        let req = ResolveRequest {
            query: "what is the date?",
            history: &history,
            last_document_id: Some("2"),
        };

        let res = h.resolver.resolve(&req).await;
        assert_eq!(res.document.unwrap().id, "2");
    }

    #[tokio::test]
    async fn test_missing_referenced_document_falls_through() {
        let fallback = doc("8", "Summary of water cuts", "", None, None);
        let h = harness(
            CountingEmbedder::default(),
            vec![hit(&fallback, 0.7)],
            Arc::new(InMemoryDocumentStore::new(vec![fallback.clone()])),
        );
        let history = vec![assistant_turn(Some("gone"))];

        let res = h.resolver.resolve(&request("summary", &history)).await;
        assert_eq!(res.document.unwrap().id, "8");
        assert_eq!(h.index.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_store_failure_during_continuation_falls_through() {
        let top = doc("4", "Road repair schedule", "", None, Some("/r.pdf"));
        let h = harness(
            CountingEmbedder::default(),
            vec![hit(&top, 0.7)],
            Arc::new(BrokenStore),
        );
        let history = vec![assistant_turn(Some("123"))];

        let res = h.resolver.resolve(&request("tell me more", &history)).await;
        assert_eq!(res.document.unwrap().id, "4");
        assert_eq!(res.resolved_by, ResolvedBy::VectorRank);
        assert_eq!(h.index.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_follow_up_intent_ignores_reference() {
        let referenced = doc("123", "Ward office timings", "", None, None);
        let h = harness(
            CountingEmbedder::default(),
            Vec::new(),
            Arc::new(InMemoryDocumentStore::new(vec![referenced])),
        );
        let history = vec![assistant_turn(Some("123"))];

        let res = h.resolver.resolve(&request("garbage collection", &history)).await;
        assert!(res.document.is_none());
        assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reference_comes_from_most_recent_assistant_turn_only() {
        let history = vec![
            assistant_turn(Some("old")),
            ConversationTurn {
                role: Role::User,
                content: "something else".to_string(),
                document_id: None,
            },
            assistant_turn(None),
        ];
        assert_eq!(referenced_document_id(&request("more", &history)), None);

        let history = vec![assistant_turn(Some(" 77 "))];
        assert_eq!(referenced_document_id(&request("more", &history)), Some("77"));
    }

    #[test]
    fn test_parse_display_date() {
        assert_eq!(
            parse_display_date("15 March 2024"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(parse_display_date("2024-03-15"), None);
    }
}
