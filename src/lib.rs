//! # Civic Desk
//!
//! A retrieval-augmented question answering backend for a municipal
//! website's circulars and acts.
//!
//! The runtime-free logic (language detection, query normalization, the
//! context-resolution cascade, answer composition) lives in
//! `civic-desk-core`. This crate wires it to real collaborators: JSON
//! content exports, SQLite or Pinecone vector indexes, OpenAI / Ollama /
//! fastembed embeddings, Gemini or OpenAI-compatible language models, and
//! an axum HTTP server.
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────┐
//!  POST /chat│ ChatService  │
//! ──────────▶│ detect lang  │
//!            │ resolve ─────┼──▶ embedder ─▶ vector index
//!            │              ├──▶ document store (JSON files)
//!            │ compose ─────┼──▶ language model
//!            └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! civic index                       # embed the JSON exports
//! civic ask "latest circular"       # one-shot answer
//! civic serve                       # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`store`] | JSON-file document store |
//! | [`embedding`] | Embedding provider implementations |
//! | [`index`] | SQLite and Pinecone vector indexes |
//! | [`llm`] | Language model clients |
//! | [`chat`] | The chat pipeline |
//! | [`server`] | HTTP server |
//! | [`index_cmd`] | `civic index` |
//! | [`search_cmd`] | `civic search` |

pub mod chat;
pub mod config;
pub mod embedding;
pub mod index;
pub mod index_cmd;
pub mod llm;
pub mod search_cmd;
pub mod server;
pub mod store;
