//! Build the owned [`MimePart`] tree from raw message bytes.
//!
//! `mail-parser` finds the part boundaries; headers, content types and
//! bodies are then read from the raw bytes by this crate, so that broken
//! `Content-Type` values go through the configured handler instead of being
//! silently reinterpreted.

use mail_parser::{Message, MessageParser, PartType};
use tracing::{debug, warn};

use crate::model::content_type::ContentType;
use crate::model::part::{AttachmentInfo, MimePart};
use crate::parser::content_type::clean;
use crate::parser::header::{decode_header_bytes, split_headers};

/// Turns a raw `Content-Type` header value (empty when absent) into a usable content type.
pub type ContentTypeHandler = fn(&str) -> ContentType;

/// Parser leniency settings, passed explicitly to every [`parse_message`] call.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Applied to the `Content-Type` of every part.
    pub content_type_handler: ContentTypeHandler,
    /// Multipart containers nested deeper than this are kept as empty leaves.
    pub max_depth: usize,
    /// Salvage what is decodable from corrupt base64 bodies instead of failing.
    pub ignore_base64_errors: bool,
    /// Drop a leading mbox `From ` line.
    pub skip_from_line: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            content_type_handler: clean,
            max_depth: 32,
            ignore_base64_errors: true,
            skip_from_line: true,
        }
    }
}

/// Parse a complete raw message (headers + body) into a part tree.
///
/// Never fails: input `mail-parser` cannot make sense of becomes a single
/// part split at the first blank line.
pub fn parse_message(raw: &[u8], options: &ParserOptions) -> MimePart {
    let data = strip_bom(raw);
    let data = if options.skip_from_line {
        skip_from_line(data)
    } else {
        data
    };

    match MessageParser::default().parse(data) {
        Some(message) if !message.parts.is_empty() => build_part(&message, data, 0, 0, options),
        _ => {
            debug!("Message could not be parsed as MIME, reading it as a single part");
            single_part(data, options)
        }
    }
}

fn build_part(
    message: &Message<'_>,
    data: &[u8],
    id: usize,
    depth: usize,
    options: &ParserOptions,
) -> MimePart {
    let part = &message.parts[id];
    let body_start = (part.offset_body as usize).min(data.len());
    let header_start = (part.offset_header as usize).min(body_start);
    let body_end = (part.offset_end as usize).clamp(body_start, data.len());

    let headers = split_headers(&decode_header_bytes(&data[header_start..body_start]));
    let content_type = normalized_content_type(&headers, options);
    let info = AttachmentInfo::from_message_part(part);

    let child_ids = match &part.body {
        PartType::Multipart(child_ids) if content_type.is_multipart() => child_ids,
        other => {
            if matches!(other, PartType::Multipart(_)) {
                debug!(
                    content_type = %content_type,
                    "Part split as multipart but typed otherwise, keeping its raw body"
                );
            }
            let body = trim_delimiter_newline(data, body_start, body_end).to_vec();
            return new_part(headers, content_type, body, info, options);
        }
    };

    let mut mime_part = new_part(headers, content_type, Vec::new(), info, options);
    if depth >= options.max_depth {
        warn!(depth, "Multipart nesting too deep, ignoring children");
    } else {
        let children = child_ids
            .iter()
            .copied()
            .filter(|&child| child != id && child < message.parts.len())
            .map(|child| build_part(message, data, child, depth + 1, options))
            .collect();
        mime_part.set_children(children);
    }

    mime_part
}

fn normalized_content_type(headers: &[(String, String)], options: &ParserOptions) -> ContentType {
    let raw_content_type = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Type"))
        .map(|(_, value)| value.as_str())
        .unwrap_or("");
    (options.content_type_handler)(raw_content_type)
}

fn new_part(
    headers: Vec<(String, String)>,
    content_type: ContentType,
    body: Vec<u8>,
    info: AttachmentInfo,
    options: &ParserOptions,
) -> MimePart {
    let mut part = MimePart::with_attachment_info(headers, content_type, body, info);
    part.set_ignore_base64_errors(options.ignore_base64_errors);
    part
}

/// Fallback for unparsable input: everything before the first blank line is headers.
fn single_part(data: &[u8], options: &ParserOptions) -> MimePart {
    let (header_bytes, body) = match find_header_end(data) {
        Some((end, separator_len)) => (&data[..end], &data[end + separator_len..]),
        None => (data, &data[data.len()..]),
    };
    let headers = split_headers(&decode_header_bytes(header_bytes));
    let content_type = normalized_content_type(&headers, options);
    let mut part = MimePart::new(headers, content_type, body.to_vec());
    part.set_ignore_base64_errors(options.ignore_base64_errors);
    part
}

/// The line break before a boundary delimiter belongs to the delimiter.
fn trim_delimiter_newline(data: &[u8], start: usize, end: usize) -> &[u8] {
    let body = &data[start..end];
    if !data[end..].starts_with(b"--") {
        return body;
    }
    body.strip_suffix(b"\r\n")
        .or_else(|| body.strip_suffix(b"\n"))
        .unwrap_or(body)
}

fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Skip the `From ` separator line at the start of mbox-exported messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    if data.starts_with(b"From ") {
        // Find end of line
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Find the first blank line, returning its offset and the separator length.
fn find_header_end(data: &[u8]) -> Option<(usize, usize)> {
    // Look for \n\n or \r\n\r\n
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if data[i..].starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
    }
    None
}
