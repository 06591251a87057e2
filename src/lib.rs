//! `eml2html` — render emails as self-contained HTML documents.
//!
//! This crate provides the core library for parsing possibly malformed MIME
//! messages, repairing broken `Content-Type` headers, choosing the body,
//! embedding inline images and extracting attachments.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod render;
