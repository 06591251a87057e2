//! Intermediate and final results of a conversion.

use std::collections::HashMap;

use super::content_type::ContentType;
use crate::parser::content_type::default_content_type;

/// The text selected as the message body, with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyCandidate {
    pub text: String,
    pub content_type: ContentType,
}

impl Default for BodyCandidate {
    /// Empty `text/plain; charset="utf-8"`, used when no body part qualifies.
    fn default() -> Self {
        Self {
            text: String::new(),
            content_type: default_content_type(),
        }
    }
}

impl BodyCandidate {
    /// `true` when the body is `text/html`.
    pub fn is_html(&self) -> bool {
        self.content_type.matches("text/html")
    }

    /// The body charset, defaulting to UTF-8.
    pub fn charset(&self) -> &str {
        self.content_type
            .charset()
            .unwrap_or(crate::parser::charset::DEFAULT_CHARSET)
    }
}

/// An embedded image, base64-encoded for use in a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub base64: String,
    pub content_type: ContentType,
}

/// Inline images keyed by their `Content-Id` header value, brackets included.
pub type InlineImageMap = HashMap<String, InlineImage>;

/// A message rendered as a standalone HTML document, plus its decoded headers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RenderedMail {
    /// The HTML document.
    #[serde(skip)]
    pub html: String,

    /// Charset the document declares and must be written in.
    pub charset: String,

    /// Decoded `Subject` (empty when missing).
    pub subject: String,

    /// Decoded `From`, falling back to `Sender`.
    pub from: Option<String>,

    /// Decoded `To` addresses.
    pub to: Vec<String>,

    /// Decoded `Cc` addresses.
    pub cc: Vec<String>,

    /// Formatted `Date`, or the raw value when it could not be parsed.
    pub sent_date: Option<String>,
}
