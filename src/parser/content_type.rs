//! Repair of broken `Content-Type` header values.
//!
//! Mail clients in the wild emit things like `text/html; ;;;; charset="x"`,
//! `text/html; charset:utf-8`, `text/plain; latin1` or even
//! `charset=3Dutf-16` (a quoted-printable encoded header). [`clean`] turns
//! any of those into a usable [`ContentType`] and never fails.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::content_type::ContentType;
use crate::parser::charset::{Charset, DEFAULT_CHARSET};
use crate::parser::transfer::decode_quoted_printable_str;

/// Base type assumed for parts without a usable `Content-Type`.
pub const DEFAULT_BASE_TYPE: &str = "text/plain";

/// `;` followed by any run of whitespace and `;`, ending in `;`.
static SEMICOLON_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";[\s;]*;").expect("valid regex"));

/// `name (= or :) value` up to the next `;` or the end of input.
static COLON_AS_PARAM_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)([^=:]*)(=|:)(.*?(;|\z))").expect("valid regex"));

/// `text/plain; charset="utf-8"`.
pub fn default_content_type() -> ContentType {
    with_charset(DEFAULT_BASE_TYPE, DEFAULT_CHARSET)
}

/// Turn an arbitrary header value into a usable content type.
///
/// `text/plain` and `text/html` results always carry a charset that
/// [`Charset::for_label`] resolves.
pub fn clean(raw: &str) -> ContentType {
    let mut content_type = ContentType::parse(raw).unwrap_or_else(|_| repair(raw));

    let is_text_body = content_type.matches("text/plain") || content_type.matches("text/html");
    if is_text_body && !has_known_charset(&content_type) {
        debug!(
            content_type = raw,
            "Charset could not be resolved, trying to read the content type as quoted-printable"
        );
        match decode_quoted_printable_str(raw).and_then(|s| ContentType::parse(&s).ok()) {
            Some(decoded) if has_known_charset(&decoded) => content_type = decoded,
            _ => content_type.set_param("charset", DEFAULT_CHARSET),
        }
    }

    content_type
}

/// The fallback chain for values the strict parser rejected.
fn repair(raw: &str) -> ContentType {
    debug!(content_type = raw, "Encountered an unparsable content type, trying to fix it");

    if raw.trim().is_empty() {
        debug!("Content type empty, using the default");
        return default_content_type();
    }

    let semicolons_fixed = fix_semicolon_sequence(raw);
    if let Ok(ct) = ContentType::parse(&semicolons_fixed) {
        debug!("Fixed content type by collapsing semicolons");
        return ct;
    }

    let colon_fixed = fix_colon_as_param_delimiter(raw);
    if let Ok(ct) = ContentType::parse(&colon_fixed) {
        debug!("Fixed content type by replacing ':' with '='");
        return ct;
    }

    if let Ok(ct) = ContentType::parse(&fix_semicolon_sequence(&colon_fixed)) {
        debug!("Fixed content type by replacing ':' and collapsing semicolons");
        return ct;
    }

    if let Some(ct) = find_by_brute_force(raw) {
        debug!(content_type = %ct, "Fixed content type by searching for known names");
        return ct;
    }

    debug!(content_type = raw, "Broken content type, using the default");
    default_content_type()
}

fn fix_semicolon_sequence(raw: &str) -> String {
    SEMICOLON_SEQUENCE.replace_all(raw, ";").into_owned()
}

fn fix_colon_as_param_delimiter(raw: &str) -> String {
    COLON_AS_PARAM_DELIMITER.replace_all(raw, "${1}=${3}").into_owned()
}

/// Look for `text/html` or `text/plain` and any known charset name anywhere in the value.
fn find_by_brute_force(raw: &str) -> Option<ContentType> {
    let lower = raw.to_lowercase();

    let base_type = if lower.contains("text/html") {
        "text/html"
    } else if lower.contains("text/plain") {
        "text/plain"
    } else {
        return None;
    };

    let charset = Charset::find_in(&lower)
        .map(|c| c.name())
        .unwrap_or(DEFAULT_CHARSET);
    Some(with_charset(base_type, charset))
}

fn with_charset(base_type: &str, charset: &str) -> ContentType {
    let (primary, sub) = base_type.split_once('/').unwrap_or((base_type, ""));
    let mut content_type = ContentType::new(primary, sub);
    content_type.set_param("charset", charset);
    content_type
}

fn has_known_charset(content_type: &ContentType) -> bool {
    content_type
        .charset()
        .and_then(Charset::for_label)
        .is_some()
}
