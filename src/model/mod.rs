//! Core data model types: MIME parts, content types, bodies, and attachments.

pub mod attachment;
pub mod content_type;
pub mod mail;
pub mod part;
