//! Email parsing: MIME tree building, header decoding, content type repair and charsets.

pub mod charset;
pub mod content_type;
pub mod eml;
pub mod header;
pub mod transfer;
pub mod tree;
