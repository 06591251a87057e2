//! The MIME part tree.
//!
//! A [`MimePart`] owns its children. Trees are built once by
//! [`crate::parser::tree::parse_message`] (or by hand, in tests) and only
//! read afterwards.

use std::borrow::Cow;

use mail_parser::{MessageParser, MessagePart, MimeHeaders};

use crate::error::{RenderError, Result};
use crate::model::content_type::ContentType;
use crate::parser::charset;
use crate::parser::content_type::clean;
use crate::parser::header::decode_encoded_words;
use crate::parser::transfer::{self, TransferEncoding};

/// Value of the `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum Disposition {
    Inline,
    Attachment,
    /// Any other disposition type, lower-cased.
    Other(String),
}

impl Disposition {
    fn from_type(kind: &str) -> Option<Self> {
        let kind = kind.trim().to_ascii_lowercase();
        match kind.as_str() {
            "" => None,
            "inline" => Some(Self::Inline),
            "attachment" => Some(Self::Attachment),
            _ => Some(Self::Other(kind)),
        }
    }
}

/// `Content-Disposition` type and attachment filename as read by `mail-parser`.
///
/// The filename comes from `filename` (RFC 2231 continuations and charsets
/// included) or the `Content-Type` `name` parameter.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttachmentInfo {
    disposition: Option<Disposition>,
    filename: Option<String>,
}

impl AttachmentInfo {
    pub(crate) fn from_message_part(part: &MessagePart<'_>) -> Self {
        Self {
            disposition: part
                .content_disposition()
                .and_then(|d| Disposition::from_type(d.ctype())),
            filename: part.attachment_name().map(String::from),
        }
    }

    /// For parts built by hand: run the two headers through `mail-parser` on their own.
    fn from_headers(headers: &[(String, String)]) -> Self {
        let mut raw = Vec::new();
        for (name, value) in headers.iter().filter(|(name, _)| {
            name.eq_ignore_ascii_case("Content-Type") || name.eq_ignore_ascii_case("Content-Disposition")
        }) {
            raw.extend_from_slice(name.as_bytes());
            raw.extend_from_slice(b": ");
            raw.extend_from_slice(value.as_bytes());
            raw.extend_from_slice(b"\r\n");
        }
        if raw.is_empty() {
            return Self::default();
        }
        raw.extend_from_slice(b"\r\n");

        MessageParser::default()
            .parse(raw.as_slice())
            .and_then(|message| message.parts.first().map(Self::from_message_part))
            .unwrap_or_default()
    }
}

/// One node of a message: headers, (transfer-encoded) content, and children.
#[derive(Debug, Clone)]
pub struct MimePart {
    headers: Vec<(String, String)>,
    content_type: ContentType,
    disposition: Option<Disposition>,
    filename: Option<String>,
    transfer_encoding: TransferEncoding,
    body: Vec<u8>,
    children: Vec<MimePart>,
    ignore_base64_errors: bool,
}

impl MimePart {
    /// Build a part from its headers and raw (still transfer-encoded) body.
    ///
    /// `content_type` is the already-normalized type; see
    /// [`crate::parser::tree::ParserOptions::content_type_handler`].
    pub fn new(headers: Vec<(String, String)>, content_type: ContentType, body: Vec<u8>) -> Self {
        let info = AttachmentInfo::from_headers(&headers);
        Self::with_attachment_info(headers, content_type, body, info)
    }

    pub(crate) fn with_attachment_info(
        headers: Vec<(String, String)>,
        content_type: ContentType,
        body: Vec<u8>,
        info: AttachmentInfo,
    ) -> Self {
        let transfer_encoding =
            TransferEncoding::from_header(header_value(&headers, "Content-Transfer-Encoding"));
        // A repaired Content-Type may carry a name mail-parser could not read.
        let filename = info
            .filename
            .or_else(|| content_type.param("name").map(String::from))
            .map(|name| decode_encoded_words(&name))
            .filter(|name| !name.trim().is_empty());

        Self {
            headers,
            content_type,
            disposition: info.disposition,
            filename,
            transfer_encoding,
            body,
            children: Vec::new(),
            ignore_base64_errors: true,
        }
    }

    /// A leaf part with a `Content-Type` header and an identity-encoded body.
    pub fn leaf(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let headers = vec![("Content-Type".to_string(), content_type.to_string())];
        Self::new(headers, clean(content_type), body.into())
    }

    /// A `multipart/*` container.
    pub fn multipart(content_type: &str, children: Vec<MimePart>) -> Self {
        let mut part = Self::leaf(content_type, Vec::new());
        part.children = children;
        part
    }

    /// Add a header, re-deriving transfer encoding, disposition and filename.
    pub fn with_header(self, name: &str, value: &str) -> Self {
        let mut headers = self.headers;
        headers.push((name.to_string(), value.to_string()));
        let mut part = Self::new(headers, self.content_type, self.body);
        part.children = self.children;
        part.ignore_base64_errors = self.ignore_base64_errors;
        part
    }

    pub(crate) fn set_children(&mut self, children: Vec<MimePart>) {
        self.children = children;
    }

    pub(crate) fn set_ignore_base64_errors(&mut self, ignore: bool) {
        self.ignore_base64_errors = ignore;
    }

    /// All headers in order of appearance, values as sent (possibly folded).
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header (name compared case-insensitively).
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// The raw `Content-Type` header value, if present.
    pub fn raw_content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// The normalized content type.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Shorthand for `content_type().matches(pattern)`.
    pub fn is_mime_type(&self, pattern: &str) -> bool {
        self.content_type.matches(pattern)
    }

    pub fn disposition(&self) -> Option<&Disposition> {
        self.disposition.as_ref()
    }

    /// `true` when `Content-Disposition` is `attachment`.
    pub fn is_attachment(&self) -> bool {
        self.disposition == Some(Disposition::Attachment)
    }

    /// Decoded filename from `Content-Disposition` or the `name` parameter.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// The `Content-Id` header, exactly as sent (angle brackets included).
    pub fn content_id(&self) -> Option<&str> {
        self.header("Content-Id").map(str::trim)
    }

    pub fn children(&self) -> &[MimePart] {
        &self.children
    }

    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.transfer_encoding
    }

    /// Content with the transfer encoding undone.
    pub fn decoded_body(&self) -> Result<Vec<u8>> {
        transfer::decode(self.transfer_encoding, &self.body, self.ignore_base64_errors).map_err(
            |reason| RenderError::UnreadablePart {
                content_type: self.content_type.base_type(),
                reason,
            },
        )
    }

    /// Content as text, decoded with the part's charset.
    ///
    /// When the charset has no decoder the bytes are read as UTF-8.
    pub fn text_content(&self) -> Result<String> {
        let bytes = self.decoded_body()?;
        let text: Cow<'_, str> = charset::decode_or_utf8(self.content_type.charset(), &bytes);
        Ok(text.into_owned())
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_normalizes_content_type() {
        let part = MimePart::leaf("text/html; charset:\"utf-16\"", "x");
        assert_eq!(part.content_type().base_type(), "text/html");
        assert_eq!(part.content_type().charset(), Some("utf-16"));
        assert_eq!(part.raw_content_type(), Some("text/html; charset:\"utf-16\""));
    }

    #[test]
    fn test_disposition_and_filename() {
        let part = MimePart::leaf("application/pdf", "%PDF")
            .with_header("Content-Disposition", "attachment;\r\n filename=\"report.pdf\"");
        assert!(part.is_attachment());
        assert_eq!(part.filename(), Some("report.pdf"));
    }

    #[test]
    fn test_filename_from_content_type_name() {
        let part = MimePart::leaf("image/png; name=\"=?UTF-8?Q?gr=C3=BC=C3=9Fe.png?=\"", "png");
        assert_eq!(part.disposition(), None);
        assert_eq!(part.filename(), Some("grüße.png"));
    }

    #[test]
    fn test_filename_rfc2231() {
        let part = MimePart::leaf("application/octet-stream", "x").with_header(
            "Content-Disposition",
            "attachment; filename*=UTF-8''na%C3%AFve%20plan.txt",
        );
        assert_eq!(part.filename(), Some("naïve plan.txt"));
    }

    #[test]
    fn test_filename_rfc2231_continuation() {
        let part = MimePart::leaf("application/octet-stream", "x").with_header(
            "Content-Disposition",
            "attachment; filename*0*=UTF-8''na%C3%AF; filename*1*=ve.txt",
        );
        assert!(part.is_attachment());
        assert_eq!(part.filename(), Some("naïve.txt"));
    }

    #[test]
    fn test_other_disposition() {
        let part = MimePart::leaf("text/plain", "x").with_header("Content-Disposition", "Form-Data");
        assert_eq!(part.disposition(), Some(&Disposition::Other("form-data".into())));
        assert!(!part.is_attachment());
    }

    #[test]
    fn test_decoded_body_base64() {
        let part = MimePart::leaf("text/plain; charset=iso-8859-1", "Y2Fm6Q==")
            .with_header("Content-Transfer-Encoding", "base64");
        assert_eq!(part.text_content().unwrap(), "café");
    }

    #[test]
    fn test_content_id_kept_verbatim() {
        let part = MimePart::leaf("image/gif", "R0lG").with_header("Content-ID", " <logo@x> ");
        assert_eq!(part.content_id(), Some("<logo@x>"));
    }
}
