//! RFC 5322 header handling: folding, encoded-words (RFC 2047), and date parsing.
//!
//! Decoding never fails the conversion. Each decoder keeps the raw value
//! when it cannot do better.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::error::{RenderError, Result};
use crate::parser::charset::Charset;
use crate::parser::transfer;

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Split a header block into `(name, value)` pairs in order of appearance.
///
/// Names keep their original case. Folded values keep their line breaks
/// (`\r\n` + whitespace) so callers can see the header exactly as sent;
/// use [`unfold`] to join them.
pub fn split_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            // Continuation line
            if let Some(last) = result.last_mut() {
                last.1.push_str("\r\n");
                last.1.push_str(line);
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_string();
            let value = line[colon_pos + 1..].trim_start().to_string();
            if !name.is_empty() {
                result.push((name, value));
            }
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// Remove header folding: every line break followed by whitespace becomes
/// that whitespace.
pub fn unfold(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' if matches!(chars.peek(), Some(' ' | '\t')) => {}
            '\r' | '\n' => result.push(' '),
            _ => result.push(c),
        }
    }
    result.trim().to_string()
}

/// Decode a `Subject` header.
///
/// A missing subject becomes the empty string. Some clients break a single
/// encoded-word by inserting literal spaces into it (`=?UTF-8?Q?Bananen
/// sch=C3=A4lt?=`); such values are repaired by writing every space as `=20`
/// before decoding. If the repair does not produce a valid encoded-word the
/// raw value is returned untouched.
pub fn decode_subject(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let unfolded = unfold(raw);

    if looks_like_spaced_encoded_word(&unfolded) {
        let repaired = unfolded.replace(' ', "=20");
        return match decode_single_word(&repaired) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(subject = %unfolded, error = %e, "Could not repair malformed subject");
                unfolded
            }
        };
    }

    decode_encoded_words(&unfolded)
}

/// `=?…?=` with exactly one terminator and spaces inside.
fn looks_like_spaced_encoded_word(value: &str) -> bool {
    value.len() > 4
        && value.starts_with("=?")
        && value.ends_with("?=")
        && value.contains(' ')
        && value.matches("?=").count() == 1
}

/// Decode a single-address header such as `From` or `Sender`.
///
/// On any decoding error the unfolded value is kept.
pub fn decode_address(raw: &str) -> String {
    let unfolded = unfold(raw);
    match try_decode_encoded_words(&unfolded) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!(value = %unfolded, error = %e, "Could not decode address header");
            unfolded
        }
    }
}

/// Decode a multi-address header such as `To` or `Cc`.
///
/// The unfolded value is split on `,` and each piece decoded. Failure is
/// all-or-nothing: if any piece cannot be decoded, every piece is returned
/// undecoded.
pub fn decode_address_list(raw: &str) -> Vec<String> {
    let unfolded = unfold(raw);
    if unfolded.is_empty() {
        return Vec::new();
    }

    let pieces: Vec<String> = unfolded
        .split(',')
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect();

    match pieces
        .iter()
        .map(|piece| try_decode_encoded_words(piece))
        .collect::<Result<Vec<_>>>()
    {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!(value = %unfolded, error = %e, "Could not decode address list");
            pieces
        }
    }
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// If decoding fails the original text is preserved.
pub fn decode_encoded_words(input: &str) -> String {
    try_decode_encoded_words(input).unwrap_or_else(|e| {
        debug!(value = input, error = %e, "Keeping undecodable header value");
        input.to_string()
    })
}

/// Decode RFC 2047 encoded-words, failing on an unknown charset or an
/// invalid payload.
///
/// Text that merely resembles an encoded-word (`=?` without a proper
/// `charset?encoding?text?=` structure) is kept literally.
pub fn try_decode_encoded_words(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // If the gap between two encoded words is only whitespace, skip it (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        if let Some(word) = split_one_word(after_start) {
            result.push_str(&word.decode()?);
            remaining = &remaining[start + 2 + word.consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    Ok(result)
}

/// Decode a value that must consist of exactly one encoded-word.
pub fn decode_single_word(input: &str) -> Result<String> {
    let inner = input
        .strip_prefix("=?")
        .ok_or_else(|| RenderError::UnreadableHeader(format!("not an encoded-word: {input}")))?;
    match split_one_word(inner) {
        Some(word) if word.consumed == inner.len() => word.decode(),
        _ => Err(RenderError::UnreadableHeader(format!(
            "not a single encoded-word: {input}"
        ))),
    }
}

struct EncodedWord<'a> {
    charset: &'a str,
    encoding: &'a str,
    text: &'a str,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

impl EncodedWord<'_> {
    fn decode(&self) -> Result<String> {
        let bytes = match self.encoding.to_ascii_uppercase().as_str() {
            "B" => transfer::decode(transfer::TransferEncoding::Base64, self.text.as_bytes(), false)
                .map_err(RenderError::UnreadableHeader)?,
            "Q" => decode_q_encoding(self.text),
            other => {
                return Err(RenderError::UnreadableHeader(format!(
                    "unknown encoded-word encoding '{other}'"
                )))
            }
        };

        // RFC 2231 allows a language suffix: charset*lang
        let charset = self.charset.split('*').next().unwrap_or(self.charset);
        let charset = Charset::for_label(charset).ok_or_else(|| {
            RenderError::UnreadableHeader(format!("unknown charset '{}'", self.charset))
        })?;
        Ok(charset.decode(&bytes).into_owned())
    }
}

fn split_one_word(s: &str) -> Option<EncodedWord<'_>> {
    // Format: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let text = &rest2[..end];

    if charset.is_empty() || encoding.is_empty() {
        return None;
    }

    Some(EncodedWord {
        charset,
        encoding,
        text,
        consumed: first_q + 1 + second_q + 1 + end + 2,
    })
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("00");
                result.push(u8::from_str_radix(hex, 16).unwrap_or(b'?'));
                i += 3;
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Format the `Date` header for display.
///
/// Unparsable dates fall back to the raw header value; a missing header gives `None`.
pub fn format_sent_date(raw: Option<&str>, format: &str) -> Option<String> {
    let raw = unfold(raw?);
    match parse_date(&raw) {
        Some(dt) => Some(dt.format(format).to_string()),
        None => {
            warn!(date = %raw, "Could not parse the date, falling back to the raw value");
            Some(raw)
        }
    }
}

/// Parse an email date string in various common formats.
///
/// Supports RFC 2822, ISO 8601, and many broken real-world variants.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Try chrono's RFC 2822
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // Try ISO 8601 / RFC 3339
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // Drop a trailing comment such as "(CET)"
    let no_comment = match trimmed.find('(') {
        Some(pos) => trimmed[..pos].trim(),
        None => trimmed,
    };

    // Remove leading day-of-week: "Thu, " or "Thu "
    let no_dow = strip_day_of_week(no_comment);

    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%d %b %Y %H:%M:%S",
        "%b %d %H:%M:%S %Y",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
    ];

    for candidate in [no_dow.clone(), replace_named_tz(&no_dow)] {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(&candidate, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
                return Some(Utc.from_utc_datetime(&ndt));
            }
        }
    }

    None
}

/// Strip leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    let days = [
        "Mon,", "Tue,", "Wed,", "Thu,", "Fri,", "Sat,", "Sun,", "Mon ", "Tue ", "Wed ", "Thu ",
        "Fri ", "Sat ", "Sun ",
    ];
    for day in &days {
        if let Some(rest) = s.strip_prefix(day) {
            return rest.trim().to_string();
        }
    }
    s.to_string()
}

/// Replace well-known timezone abbreviations with numeric offsets.
fn replace_named_tz(s: &str) -> String {
    let tzs = [
        ("CEST", "+0200"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CET", "+0100"),
    ];
    let mut result = s.to_string();
    for (name, offset) in &tzs {
        if result.ends_with(name) {
            let pos = result.len() - name.len();
            result.replace_range(pos.., offset);
            return result;
        }
    }
    result
}
