//! Conversion of a MIME tree into a standalone HTML document.
//!
//! [`convert_to_html`] selects the body ([`body::find_body`]), collects the
//! inline images ([`images::find_inline_images`]), assembles the document
//! ([`html::assemble`]) and decodes the display headers.

pub mod attachments;
pub mod body;
pub mod html;
pub mod images;
pub mod walk;

use tracing::{debug, info};

use crate::error::Result;
use crate::model::mail::{InlineImageMap, RenderedMail};
use crate::model::part::MimePart;
use crate::parser::header::{decode_address, decode_address_list, decode_subject, format_sent_date};

pub use attachments::list_attachments;

/// Default `strftime` format for the `Date` header.
pub const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y %H:%M:%S %Z";

/// Options for a single conversion.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Leave `cid:` references untouched instead of embedding the images.
    pub hide_images: bool,
    /// `strftime` format used for the sent date.
    pub date_format: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            hide_images: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

/// Render a message as HTML and decode its display headers.
///
/// Broken headers and content types never fail the conversion; only a part
/// whose content cannot be read at all does.
pub fn convert_to_html(root: &MimePart, options: &RenderOptions) -> Result<RenderedMail> {
    debug!("MIME structure:\n{}", walk::print_structure(root));

    let subject = decode_subject(root.header("Subject"));
    let from = root
        .header("From")
        .or_else(|| root.header("Sender"))
        .map(decode_address);
    let to = root.header("To").map(decode_address_list).unwrap_or_default();
    let cc = root.header("Cc").map(decode_address_list).unwrap_or_default();
    let sent_date = format_sent_date(root.header("Date"), &options.date_format);

    let body = body::find_body(root)?;
    let images = if options.hide_images {
        debug!("Images hidden, not embedding inline images");
        InlineImageMap::new()
    } else {
        images::find_inline_images(root)?
    };

    let (html, charset) = html::assemble(&body, &images);

    info!(
        subject = %subject,
        charset = %charset,
        html = body.is_html(),
        images = images.len(),
        "Converted message to HTML"
    );
    debug!(from = ?from, to = ?to, cc = ?cc, date = ?sent_date, "Decoded headers");
    debug!(excerpt = %excerpt(&html), "Body");

    Ok(RenderedMail {
        html,
        charset,
        subject,
        from,
        to,
        cc,
        sent_date,
    })
}

/// First 40 and last 20 characters of a long document, without line breaks.
fn excerpt(html: &str) -> String {
    let flat: Vec<char> = html.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    if flat.len() < 60 {
        return flat.into_iter().collect();
    }
    let head: String = flat[..40].iter().collect();
    let tail: String = flat[flat.len() - 20..].iter().collect();
    format!("{head} [...] {tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> MimePart {
        MimePart::multipart(
            "multipart/related; boundary=r",
            vec![
                MimePart::leaf("text/html; charset=utf-8", "<p><img src=\"cid:pic@x\"></p>"),
                MimePart::leaf("image/png", "png").with_header("Content-ID", "<pic@x>"),
            ],
        )
        .with_header("Subject", "=?UTF-8?Q?Gr=C3=BC=C3=9Fe?=")
        .with_header("Sender", "=?ISO-8859-1?Q?J=F6rg?= <jorg@example.com>")
        .with_header("To", "a@example.com,\r\n b@example.com")
        .with_header("Date", "Tue, 1 Jul 2003 10:52:37 +0200")
    }

    #[test]
    fn test_convert_to_html() {
        let mail = convert_to_html(&message(), &RenderOptions::default()).unwrap();
        assert_eq!(mail.subject, "Grüße");
        assert_eq!(mail.from.as_deref(), Some("Jörg <jorg@example.com>"));
        assert_eq!(mail.to, vec!["a@example.com", "b@example.com"]);
        assert!(mail.cc.is_empty());
        assert_eq!(mail.sent_date.as_deref(), Some("July 1, 2003 08:52:37 UTC"));
        assert_eq!(mail.charset, "utf-8");
        assert_eq!(mail.html, "<p><img src=\"data:image/png;base64,cG5n\"></p>");
    }

    #[test]
    fn test_hide_images_keeps_cid_references() {
        let options = RenderOptions {
            hide_images: true,
            ..RenderOptions::default()
        };
        let mail = convert_to_html(&message(), &options).unwrap();
        assert_eq!(mail.html, "<p><img src=\"cid:pic@x\"></p>");
    }

    #[test]
    fn test_missing_headers() {
        let mail = convert_to_html(&MimePart::leaf("text/plain", "hi"), &RenderOptions::default()).unwrap();
        assert_eq!(mail.subject, "");
        assert_eq!(mail.from, None);
        assert_eq!(mail.sent_date, None);
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short\r\n"), "short");
        let long = "a".repeat(50) + &"b".repeat(50);
        assert_eq!(excerpt(&long), format!("{} [...] {}", "a".repeat(40), "b".repeat(20)));
    }
}
