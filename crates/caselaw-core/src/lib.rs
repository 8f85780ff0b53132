//! # Caselaw Core
//!
//! Runtime-free logic for the Caselaw ingestion pipeline: data models,
//! side-table merging and metadata flattening, content validation,
//! chunking, the embedder and vector-store traits, the index gate,
//! sub-batched upsert, and diversity-aware search.
//!
//! This crate contains no tokio runtime, HTTP client, or filesystem I/O.
//! Remote providers and orchestration live in the `caselaw` app crate.

pub mod chunk;
pub mod embedding;
pub mod gate;
pub mod metadata;
pub mod models;
pub mod records;
pub mod search;
pub mod store;
pub mod upsert;
pub mod validate;
