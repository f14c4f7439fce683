//! # Civic Desk Core
//!
//! Runtime-free logic for Civic Desk: the document model, query
//! normalization, intent patterns, language detection, collaborator traits,
//! the context-resolution cascade, and answer composition.
//!
//! This crate contains no tokio, sqlx, HTTP clients, or filesystem I/O.
//! Every external service (embedding model, vector index, document store,
//! language model) is reached through a trait, and concrete adapters are
//! injected by the `civic-desk` application crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Documents, index metadata, conversation turns |
//! | [`query`] | Query normalization and text confirmation |
//! | [`intent`] | Follow-up and "latest" intent patterns |
//! | [`language`] | Script-based language detection |
//! | [`links`] | Absolute URL derivation |
//! | [`embedding`] | Embedding provider trait and vector helpers |
//! | [`index`] | Vector index trait and in-memory index |
//! | [`store`] | Document store trait and in-memory store |
//! | [`resolve`] | The context-resolution cascade |
//! | [`compose`] | Prompt building, link rewriting, fallbacks |

pub mod compose;
pub mod embedding;
pub mod index;
pub mod intent;
pub mod language;
pub mod links;
pub mod models;
pub mod query;
pub mod resolve;
pub mod store;
