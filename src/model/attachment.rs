//! Attachments found in a message.

use crate::model::content_type::ContentType;

/// A decoded attachment, ready to be written somewhere.
///
/// Ownership passes to whoever extracts it; nothing in this crate keeps a
/// reference to the source tree.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Attachment {
    /// Filename from the headers, if the sender provided one.
    pub filename: Option<String>,

    /// Normalized content type of the part.
    pub content_type: ContentType,

    /// Content with the transfer encoding undone.
    #[serde(skip)]
    pub data: Vec<u8>,

    /// Decoded size in bytes.
    pub size: u64,
}
