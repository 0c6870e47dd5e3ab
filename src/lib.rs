//! Multi-tenant knowledge base indexing and hybrid retrieval core.
//!
//! `domain` defines the business types, error taxonomy, and port traits; `adapters` and
//! `parsing`/`chunking` implement those ports; `application` orchestrates them into the
//! processing pipeline and retrieval pipeline; `server` is the thin HTTP surface that drives
//! `application` from the outside.

pub mod adapters;
pub mod application;
pub mod chunking;
pub mod config;
pub mod domain;
pub mod parsing;
pub mod server;
