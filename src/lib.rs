#![deny(missing_docs)]

//! Core library for Rusty Docs: document extraction, chunking, and provenance tagging.

/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document processing pipeline.
pub mod processing;
/// Chunk sinks for embedding and indexing.
pub mod sink;
