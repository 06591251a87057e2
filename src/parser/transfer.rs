//! Content-Transfer-Encoding decoding (RFC 2045 §6).

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Base64 engine that accepts missing or superfluous padding and stray trailing bits.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// The transfer encodings this crate knows how to undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum TransferEncoding {
    /// `7bit`, `8bit`, `binary`, or anything unknown.
    #[default]
    Identity,
    QuotedPrintable,
    Base64,
}

impl TransferEncoding {
    /// Interpret a `Content-Transfer-Encoding` header value.
    ///
    /// Unknown encodings are treated as identity.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("base64") => Self::Base64,
            Some("quoted-printable") => Self::QuotedPrintable,
            _ => Self::Identity,
        }
    }
}

/// Undo the transfer encoding of a body.
///
/// With `ignore_base64_errors`, characters outside the base64 alphabet are
/// dropped and a dangling final symbol is discarded instead of failing.
pub fn decode(
    encoding: TransferEncoding,
    data: &[u8],
    ignore_base64_errors: bool,
) -> Result<Vec<u8>, String> {
    match encoding {
        TransferEncoding::Identity => Ok(data.to_vec()),
        TransferEncoding::QuotedPrintable => {
            quoted_printable::decode(data, quoted_printable::ParseMode::Robust)
                .map_err(|e| format!("quoted-printable decode: {e}"))
        }
        TransferEncoding::Base64 => {
            let compact: Vec<u8> = data
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            match LENIENT_BASE64.decode(&compact) {
                Ok(bytes) => Ok(bytes),
                Err(e) if ignore_base64_errors => {
                    tracing::debug!(error = %e, "Invalid base64 body, decoding what is salvageable");
                    let mut salvaged: Vec<u8> = compact
                        .into_iter()
                        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
                        .collect();
                    if salvaged.len() % 4 == 1 {
                        salvaged.pop();
                    }
                    LENIENT_BASE64
                        .decode(&salvaged)
                        .map_err(|e| format!("base64 decode: {e}"))
                }
                Err(e) => Err(format!("base64 decode: {e}")),
            }
        }
    }
}

/// Decode a quoted-printable string, as used for repairing header values.
pub fn decode_quoted_printable_str(input: &str) -> Option<String> {
    quoted_printable::decode(input.as_bytes(), quoted_printable::ParseMode::Robust)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Standard base64 with padding, as embedded in `data:` URIs.
pub fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header() {
        assert_eq!(TransferEncoding::from_header(Some(" BASE64 ")), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::from_header(Some("quoted-printable")),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::from_header(Some("x-uuencode")), TransferEncoding::Identity);
        assert_eq!(TransferEncoding::from_header(None), TransferEncoding::Identity);
    }

    #[test]
    fn test_decode_base64_with_line_breaks() {
        let decoded = decode(TransferEncoding::Base64, b"SGVsbG8s\r\nIHdvcmxk\r\n", false).unwrap();
        assert_eq!(decoded, b"Hello, world");
    }

    #[test]
    fn test_decode_base64_garbage() {
        assert!(decode(TransferEncoding::Base64, b"SGVs*bG8", false).is_err());
        let decoded = decode(TransferEncoding::Base64, b"SGVs*bG8", true).unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn test_decode_quoted_printable() {
        let decoded = decode(
            TransferEncoding::QuotedPrintable,
            b"Bananen sch=C3=A4lt=\r\n man",
            false,
        )
        .unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "Bananen schält man");
    }

    #[test]
    fn test_decode_quoted_printable_str() {
        assert_eq!(
            decode_quoted_printable_str("text/html; charset=3Dutf-16").as_deref(),
            Some("text/html; charset=utf-16")
        );
    }
}
