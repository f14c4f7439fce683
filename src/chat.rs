//! The chat pipeline: detect language, resolve context, compose the answer.
//!
//! [`ChatService`] owns the resolver and the composer and is shared by the
//! HTTP server and the `civic ask` command. Collaborators are built once
//! from configuration (or injected directly by tests and embedding callers).

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use civic_desk_core::compose::{direct_answer, AnswerComposer, ComposerParams, TextGenerator};
use civic_desk_core::embedding::EmbeddingProvider;
use civic_desk_core::index::VectorIndex;
use civic_desk_core::language::{detect_language, Language};
use civic_desk_core::models::{string_or_number, ConversationTurn, Document, ResolvedBy};
use civic_desk_core::resolve::{ContextResolver, ResolveRequest, ResolverParams};
use civic_desk_core::store::DocumentStore;

use crate::config::Config;
use crate::store::JsonDocumentStore;
use crate::{embedding, index, llm};

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub last_circular_id: Option<String>,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            last_circular_id: None,
            history: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            bail!("query must not be empty");
        }
        Ok(())
    }
}

/// Metadata of the grounding document.
#[derive(Debug, Clone, Serialize)]
pub struct CircularMetadata {
    pub id: String,
    pub title: String,
    pub display_date: Option<String>,
    pub link: Option<String>,
    pub content_type: String,
}

/// One raw similarity match, returned for transparency.
#[derive(Debug, Clone, Serialize)]
pub struct ContextResult {
    pub id: String,
    pub score: f32,
    pub title: String,
    pub text: String,
    pub content_type: String,
    pub link: Option<String>,
}

/// Response of `POST /chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub language: Language,
    /// Plain summary of the document, present only when the query text was
    /// found verbatim in it.
    pub direct_answer: Option<String>,
    pub circular_metadata: Option<CircularMetadata>,
    pub context_results: Vec<ContextResult>,
    pub resolved_by: ResolvedBy,
}

/// Tunables shared by the resolver and composer.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub top_k: usize,
    pub context_results: usize,
    pub history_exchanges: usize,
    pub excerpt_chars: usize,
    pub site_name: String,
    pub site_base_url: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            context_results: 3,
            history_exchanges: 3,
            excerpt_chars: 1500,
            site_name: "PMC".to_string(),
            site_base_url: String::new(),
        }
    }
}

impl ChatSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            context_results: config.retrieval.context_results,
            history_exchanges: config.retrieval.history_exchanges,
            excerpt_chars: config.retrieval.excerpt_chars,
            site_name: config.site.name.clone(),
            site_base_url: config.site.base_url.clone(),
        }
    }
}

pub struct ChatService {
    resolver: ContextResolver,
    composer: AnswerComposer,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn DocumentStore>,
        generator: Arc<dyn TextGenerator>,
        settings: ChatSettings,
    ) -> Self {
        let resolver = ContextResolver::new(
            embedder,
            index,
            store,
            ResolverParams {
                top_k: settings.top_k,
                site_base_url: settings.site_base_url.clone(),
            },
        );
        let composer = AnswerComposer::new(
            generator,
            ComposerParams {
                site_name: settings.site_name.clone(),
                site_base_url: settings.site_base_url.clone(),
                history_exchanges: settings.history_exchanges,
                excerpt_chars: settings.excerpt_chars,
            },
        );
        Self {
            resolver,
            composer,
            settings,
        }
    }

    /// Build every collaborator from configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = embedding::create_provider(&config.embedding)?;
        let index = index::create_index(&config.index).await?;
        let store: Arc<dyn DocumentStore> = Arc::new(JsonDocumentStore::from_config(&config.store));
        let generator = llm::create_generator(&config.llm)?;

        info!(
            embedding = embedder.model_name(),
            index = index.backend(),
            llm = generator.model_name(),
            "chat service ready"
        );

        if !config.llm.is_enabled() {
            warn!("no language model configured, answers use the templated fallback");
        }
        Ok(Self::new(
            embedder,
            index,
            store,
            generator,
            ChatSettings::from_config(config),
        ))
    }

    /// Answer one chat request. Upstream failures degrade the answer but
    /// never fail the call.
    pub async fn answer(&self, request: &ChatRequest) -> ChatResponse {
        let query = request.query.trim();
        let language = detect_language(query);

        let resolution = self
            .resolver
            .resolve(&ResolveRequest {
                query,
                history: &request.history,
                last_document_id: request.last_circular_id.as_deref(),
            })
            .await;

        let document = resolution.document.as_ref();
        let answer = self
            .composer
            .compose(query, document, &request.history, language)
            .await;

        let direct = document
            .filter(|_| resolution.is_text_confirmed())
            .map(|doc| direct_answer(doc, answer.link.as_deref(), self.settings.excerpt_chars));

        let context_results = resolution
            .matches
            .iter()
            .take(self.settings.context_results)
            .map(|m| ContextResult {
                id: m.document.id.clone(),
                score: m.score,
                title: m.document.title.clone(),
                text: m.document.body.clone(),
                content_type: m.document.content_type.clone(),
                link: m.url.clone(),
            })
            .collect();

        info!(
            resolved_by = ?resolution.resolved_by,
            document = document.map(|d| d.id.as_str()).unwrap_or("-"),
            language = language.tag(),
            generated = answer.generated,
            "answered chat query"
        );

        ChatResponse {
            circular_metadata: document.map(|doc| self.metadata(doc)),
            answer: answer.text,
            language,
            direct_answer: direct,
            context_results,
            resolved_by: resolution.resolved_by,
        }
    }

    fn metadata(&self, doc: &Document) -> CircularMetadata {
        CircularMetadata {
            id: doc.id.clone(),
            title: doc.title.clone(),
            display_date: doc.display_date.clone(),
            link: self.composer.document_link(doc),
            content_type: doc.content_type.clone(),
        }
    }
}
