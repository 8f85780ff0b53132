//! # Caselaw
//!
//! Semantic search over a corpus of legal-case PDFs.
//!
//! The heart of the crate is an idempotent bootstrap pipeline that turns a
//! directory of PDFs plus a curated side-table into a populated vector
//! index, tolerating per-batch provider failures.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────┐
//! │ PDFs +      │──▶│  Bootstrap pipeline   │──▶│ Pinecone │
//! │ side-table  │   │ merge/split/embed     │   │  index   │
//! └─────────────┘   └──────────────────────┘   └────┬─────┘
//!                                                   │
//!                      ┌────────────────────────────┤
//!                      ▼                            ▼
//!                 ┌──────────┐                ┌──────────┐
//!                 │   CLI    │                │   HTTP   │
//!                 │(caselaw) │                │  (axum)  │
//!                 └──────────┘                └──────────┘
//! ```
//!
//! Pure pipeline logic (metadata merge, validation, chunking, batching,
//! MMR) lives in the runtime-free `caselaw-core` crate; this crate adds
//! PDF loading, the remote providers, and the CLI and HTTP surfaces.
//!
//! ## Quick Start
//!
//! ```bash
//! caselaw bootstrap --dry-run         # count documents and chunks
//! caselaw bootstrap                   # ensure index, ingest if empty
//! caselaw search "right to privacy"
//! caselaw serve                       # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | Per-page PDF text extraction |
//! | [`loader`] | Document discovery and parsing |
//! | [`side_table`] | Curated metadata reader |
//! | [`embedding`] | Voyage embedding provider |
//! | [`pinecone`] | Pinecone vector store client |
//! | [`vector_store`] | Store selection |
//! | [`bootstrap`] | Pipeline orchestrator |
//! | [`search`] | Search command |
//! | [`stats`] | Index statistics command |
//! | [`server`] | HTTP trigger surface |

pub mod bootstrap;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod loader;
pub mod pinecone;
pub mod search;
pub mod server;
pub mod side_table;
pub mod stats;
pub mod vector_store;
