//! Export functionality: attachment extraction and filename sanitizing.

pub mod attachment;
pub mod filename;
