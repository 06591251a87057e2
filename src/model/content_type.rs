//! MIME `Content-Type` values (RFC 2045 §5.1).
//!
//! [`ContentType::parse`] is deliberately strict: any deviation from the
//! grammar is an error. Repairing broken header values is the job of
//! [`crate::parser::content_type::clean`], which retries this parser on
//! progressively patched inputs.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned when a string is not a valid `Content-Type` value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unparsable content type '{input}': {reason}")]
pub struct ContentTypeError {
    pub input: String,
    pub reason: String,
}

/// A parsed `type/subtype; name=value` header value.
///
/// Type, subtype and parameter names are stored lower-cased, so equality and
/// lookups are case-insensitive. Parameter order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ContentType {
    primary: String,
    sub: String,
    params: Vec<(String, String)>,
}

impl ContentType {
    /// Create a content type without parameters.
    pub fn new(primary: &str, sub: &str) -> Self {
        Self {
            primary: primary.to_ascii_lowercase(),
            sub: sub.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Parse a header value, failing on any syntax error.
    pub fn parse(input: &str) -> Result<Self, ContentTypeError> {
        let mut cursor = Cursor::new(input);

        cursor.skip_whitespace();
        let primary = cursor
            .token()
            .ok_or_else(|| error(input, "missing primary type"))?;
        if !cursor.eat('/') {
            return Err(error(input, "expected '/' after primary type"));
        }
        let sub = cursor.token().ok_or_else(|| error(input, "missing subtype"))?;

        let mut content_type = Self::new(primary, sub);
        for (name, value) in parse_params(&mut cursor).map_err(|reason| error(input, reason))? {
            content_type.set_param(&name, value);
        }
        Ok(content_type)
    }

    /// The primary type, e.g. `text`.
    pub fn primary_type(&self) -> &str {
        &self.primary
    }

    /// The subtype, e.g. `html`.
    pub fn sub_type(&self) -> &str {
        &self.sub
    }

    /// `type/subtype` without parameters.
    pub fn base_type(&self) -> String {
        format!("{}/{}", self.primary, self.sub)
    }

    /// Match against a base type pattern such as `text/html` or `multipart/*`.
    pub fn matches(&self, pattern: &str) -> bool {
        let (primary, sub) = pattern.split_once('/').unwrap_or((pattern, "*"));
        self.primary.eq_ignore_ascii_case(primary.trim())
            && (sub.trim() == "*" || self.sub.eq_ignore_ascii_case(sub.trim()))
    }

    /// `true` for `multipart/*`.
    pub fn is_multipart(&self) -> bool {
        self.primary == "multipart"
    }

    /// Look up a parameter by name (case-insensitive).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a parameter, replacing an existing one in place.
    ///
    /// Empty names are ignored.
    pub fn set_param(&mut self, name: &str, value: impl Into<String>) {
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return;
        }
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == name) {
            Some(existing) => existing.1 = value,
            None => self.params.push((name, value)),
        }
    }

    /// All parameters in declaration order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The `charset` parameter, if any.
    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }
}

impl FromStr for ContentType {
    type Err = ContentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.primary, self.sub)?;
        for (name, value) in &self.params {
            if !value.is_empty() && value.chars().all(is_token_char) {
                write!(f, "; {name}={value}")?;
            } else {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {name}=\"{escaped}\"")?;
            }
        }
        Ok(())
    }
}

fn error(input: &str, reason: &str) -> ContentTypeError {
    ContentTypeError {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse the `; name=value` parameter list that follows the base type of a
/// `Content-Type`.
///
/// A trailing `;` is accepted. Anything else that is not a parameter is an error.
fn parse_params(cursor: &mut Cursor<'_>) -> Result<Vec<(String, String)>, &'static str> {
    let mut params = Vec::new();
    loop {
        cursor.skip_whitespace();
        if cursor.at_end() {
            return Ok(params);
        }
        if !cursor.eat(';') {
            return Err("expected ';' between parameters");
        }
        cursor.skip_whitespace();
        if cursor.at_end() {
            return Ok(params);
        }
        let name = cursor.token().ok_or("expected parameter name")?;
        cursor.skip_whitespace();
        if !cursor.eat('=') {
            return Err("expected '=' after parameter name");
        }
        cursor.skip_whitespace();
        let value = match cursor.peek() {
            Some('"') => cursor.quoted_string().ok_or("unterminated quoted string")?,
            _ => cursor
                .token()
                .map(String::from)
                .ok_or("expected parameter value")?,
        };
        params.push((name.to_string(), value));
    }
}

/// RFC 2045 token characters: printable ASCII minus space and tspecials.
fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c)
}

/// Minimal character cursor for the header grammars in this crate.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    /// Skip whitespace, including folded line breaks.
    fn skip_whitespace(&mut self) {
        self.rest = self
            .rest
            .trim_start_matches(|c: char| c == ' ' || c == '\t' || c == '\r' || c == '\n');
    }

    fn eat(&mut self, expected: char) -> bool {
        match self.rest.strip_prefix(expected) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn token(&mut self) -> Option<&'a str> {
        let end = self
            .rest
            .find(|c: char| !is_token_char(c))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }

    /// Consume a `"…"` string with backslash escapes, returning the unescaped content.
    fn quoted_string(&mut self) -> Option<String> {
        let mut chars = self.rest.strip_prefix('"')?.char_indices();
        let mut value = String::new();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => value.push(chars.next()?.1),
                '"' => {
                    self.rest = &self.rest[i + 2..];
                    return Some(value);
                }
                _ => value.push(c),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let ct = ContentType::parse("text/html").unwrap();
        assert_eq!(ct.base_type(), "text/html");
        assert_eq!(ct.charset(), None);
    }

    #[test]
    fn test_parse_params_case_insensitive() {
        let ct = ContentType::parse("Text/HTML; CharSet=\"UTF-16\"; format=flowed").unwrap();
        assert_eq!(ct.base_type(), "text/html");
        assert_eq!(ct.charset(), Some("UTF-16"));
        assert_eq!(ct.param("FORMAT"), Some("flowed"));
    }

    #[test]
    fn test_parse_trailing_semicolon() {
        let ct = ContentType::parse("text/html;").unwrap();
        assert_eq!(ct.base_type(), "text/html");
    }

    #[test]
    fn test_parse_folded() {
        let ct = ContentType::parse("multipart/mixed;\r\n\tboundary=\"abc def\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.param("boundary"), Some("abc def"));
    }

    #[test]
    fn test_parse_rejects_broken_input() {
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("BROKEN_STRING").is_err());
        assert!(ContentType::parse("text/html; ;; charset=utf-8").is_err());
        assert!(ContentType::parse("text/html; charset:utf-8").is_err());
        assert!(ContentType::parse("text/plain; latin1").is_err());
        assert!(ContentType::parse("text/html; charset=\"utf-8").is_err());
    }

    #[test]
    fn test_matches_wildcard() {
        let ct = ContentType::parse("image/gif; name=a.gif").unwrap();
        assert!(ct.matches("image/*"));
        assert!(ct.matches("IMAGE/GIF"));
        assert!(!ct.matches("text/*"));
    }

    #[test]
    fn test_display_quotes_when_needed() {
        let mut ct = ContentType::new("text", "plain");
        ct.set_param("charset", "utf-8");
        ct.set_param("name", "my file.txt");
        assert_eq!(ct.to_string(), "text/plain; charset=utf-8; name=\"my file.txt\"");
        assert_eq!(ContentType::parse(&ct.to_string()).unwrap(), ct);
    }

    #[test]
    fn test_set_param_replaces_and_skips_empty_names() {
        let mut ct = ContentType::parse("text/plain; charset=ABC").unwrap();
        ct.set_param("Charset", "utf-8");
        ct.set_param("", "ignored");
        assert_eq!(ct.params().count(), 1);
        assert_eq!(ct.charset(), Some("utf-8"));
    }
}
