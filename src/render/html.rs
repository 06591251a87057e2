//! Turning the selected body and inline images into one HTML document.

use std::sync::LazyLock;

use html_escape::{encode_safe, encode_text};
use regex::{Captures, Regex};
use tracing::debug;

use crate::model::mail::{BodyCandidate, InlineImageMap, RenderedMail};

/// Shell for plain-text bodies: charset, then content.
const HTML_SHELL_START: &str = "<!DOCTYPE html><html><head><style>body{font-size: 0.5cm;}</style><meta charset=\"";
const HTML_SHELL_MIDDLE: &str = "\"><title>title</title></head><body>";
const HTML_SHELL_END: &str = "</body></html>";

/// `cid:<id>` up to the closing quote of the attribute.
static IMG_CID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)cid:(.*?)(["'])"#).expect("valid regex"));

/// `[cid:<id>]` as left in plain-text bodies by mail clients.
static IMG_CID_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[cid:(.*?)\]").expect("valid regex"));

/// A `<meta>` tag up to its charset value, and the value itself.
static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(<meta\b[^>]*?charset\s*=[\s"']*)([^\s"'/>]*)"#).expect("valid regex")
});

/// `<meta name=` / `<meta value=`: not a charset declaration.
static META_NAME_OR_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:name|value)\s*=").expect("valid regex"));

static BODY_OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>").expect("valid regex"));

/// Build the final document from the body and the inline images.
///
/// Returns the HTML and the charset it declares, which is always the
/// body's own charset.
pub fn assemble(body: &BodyCandidate, images: &InlineImageMap) -> (String, String) {
    let charset = body.charset().to_string();

    let html = if body.is_html() {
        let html = if images.is_empty() {
            body.text.clone()
        } else {
            debug!("Embedding referenced images as data URIs");
            embed_html_images(&body.text, images)
        };
        override_meta_charset(&html, &charset)
    } else {
        debug!("No HTML body, wrapping the plain-text body into an HTML document");
        let content = encode_text(&body.text).replace('\n', "<br>").replace('\r', "");
        let html = format!(
            "{HTML_SHELL_START}{charset}{HTML_SHELL_MIDDLE}<div style=\"white-space: pre-wrap\">{content}</div>{HTML_SHELL_END}"
        );
        if images.is_empty() {
            html
        } else {
            embed_plain_images(&html, images)
        }
    };

    (html, charset)
}

fn data_uri(images: &InlineImageMap, id: &str) -> Option<String> {
    let image = images.get(&format!("<{id}>"))?;
    Some(format!(
        "data:{};base64,{}",
        image.content_type.base_type(),
        image.base64
    ))
}

fn embed_html_images(html: &str, images: &InlineImageMap) -> String {
    IMG_CID
        .replace_all(html, |caps: &Captures<'_>| match data_uri(images, &caps[1]) {
            Some(uri) => format!("{uri}{}", &caps[2]),
            None => {
                debug!(content_id = &caps[1], "No inline image for cid reference");
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn embed_plain_images(html: &str, images: &InlineImageMap) -> String {
    IMG_CID_PLAIN
        .replace_all(html, |caps: &Captures<'_>| match data_uri(images, &caps[1]) {
            Some(uri) => format!("<img src=\"{uri}\" />"),
            None => {
                debug!(content_id = &caps[1], "No inline image for cid reference");
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Replace the charset of every `<meta … charset=…>` declaration.
fn override_meta_charset(html: &str, charset: &str) -> String {
    META_CHARSET
        .replace_all(html, |caps: &Captures<'_>| {
            let after_tag_name = &caps[1]["<meta".len()..];
            if META_NAME_OR_VALUE.is_match(after_tag_name) {
                return caps[0].to_string();
            }
            let declared = &caps[2];
            if !declared.eq_ignore_ascii_case(charset) {
                debug!(
                    declared,
                    header = charset,
                    "HTML declares a different charset than the email header, using the header's"
                );
            }
            format!("{}{charset}", &caps[1])
        })
        .into_owned()
}

/// A table of the decoded headers (From, Subject, To, Cc, Date).
///
/// Empty fields are left out; returns an empty string when all are.
pub fn header_block(mail: &RenderedMail) -> String {
    let mut rows = String::new();
    let mut row = |name: &str, value: String| {
        rows.push_str(&format!(
            "<tr><td class=\"header-name\">{name}</td><td class=\"header-value\">{value}</td></tr>"
        ));
    };

    if let Some(from) = mail.from.as_deref().filter(|f| !f.is_empty()) {
        row("From", encode_safe(from).into_owned());
    }
    if !mail.subject.is_empty() {
        row("Subject", format!("<b>{}</b>", encode_safe(&mail.subject)));
    }
    if !mail.to.is_empty() {
        row("To", encode_safe(&mail.to.join(", ")).into_owned());
    }
    if !mail.cc.is_empty() {
        row("Cc", encode_safe(&mail.cc.join(", ")).into_owned());
    }
    if let Some(date) = mail.sent_date.as_deref().filter(|d| !d.is_empty()) {
        row("Date", encode_safe(date).into_owned());
    }

    if rows.is_empty() {
        return rows;
    }
    format!(
        "<table class=\"email-headers\" style=\"border-bottom: 1px solid #ccc; margin-bottom: 1em\">{rows}</table>"
    )
}

/// Put the header table right after `<body …>`, or in front of the
/// document when there is no body tag.
pub fn insert_header_block(html: &str, block: &str) -> String {
    if block.is_empty() {
        return html.to_string();
    }
    match BODY_OPEN_TAG.find(html) {
        Some(tag) => format!("{}{block}{}", &html[..tag.end()], &html[tag.end()..]),
        None => format!("{block}{html}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mail::InlineImage;
    use crate::parser::content_type::clean;

    fn body(content_type: &str, text: &str) -> BodyCandidate {
        BodyCandidate {
            text: text.to_string(),
            content_type: clean(content_type),
        }
    }

    fn gif_map() -> InlineImageMap {
        let mut images = InlineImageMap::new();
        images.insert(
            "<logo@x>".to_string(),
            InlineImage {
                base64: "R0lG".to_string(),
                content_type: clean("image/gif; name=logo.gif"),
            },
        );
        images
    }

    #[test]
    fn test_html_cid_replacement() {
        let (html, charset) = assemble(
            &body("text/html; charset=utf-8", "<img src=\"cid:logo@x\"><img src='cid:logo@x'>"),
            &gif_map(),
        );
        assert_eq!(charset, "utf-8");
        assert_eq!(
            html,
            "<img src=\"data:image/gif;base64,R0lG\"><img src='data:image/gif;base64,R0lG'>"
        );
    }

    #[test]
    fn test_html_cid_miss_left_untouched() {
        let input = "<img src=\"cid:unknown@x\">";
        let (html, _) = assemble(&body("text/html", input), &gif_map());
        assert_eq!(html, input);
    }

    #[test]
    fn test_meta_charset_overridden() {
        let input = concat!(
            "<html><head>",
            "<meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1252\">",
            "<meta charset=\"utf-8\">",
            "</head></html>"
        );
        let (html, charset) = assemble(&body("text/html; charset=iso-8859-1", input), &InlineImageMap::new());
        assert_eq!(charset, "iso-8859-1");
        assert_eq!(
            html,
            concat!(
                "<html><head>",
                "<meta http-equiv=\"Content-Type\" content=\"text/html; charset=iso-8859-1\">",
                "<meta charset=\"iso-8859-1\">",
                "</head></html>"
            )
        );
    }

    #[test]
    fn test_meta_name_attribute_not_rewritten() {
        let input = "<meta name=\"description\" content=\"charset=koi8-r\">";
        let (html, _) = assemble(&body("text/html; charset=utf-8", input), &InlineImageMap::new());
        assert_eq!(html, input);
    }

    #[test]
    fn test_plain_text_wrapped() {
        let (html, charset) = assemble(
            &body("text/plain; charset=utf-16", "line 1\r\nline <2>\n"),
            &InlineImageMap::new(),
        );
        assert_eq!(charset, "utf-16");
        assert_eq!(
            html,
            "<!DOCTYPE html><html><head><style>body{font-size: 0.5cm;}</style>\
             <meta charset=\"utf-16\"><title>title</title></head><body>\
             <div style=\"white-space: pre-wrap\">line 1<br>line &lt;2&gt;<br></div>\
             </body></html>"
        );
    }

    #[test]
    fn test_plain_text_cid_replacement() {
        let (html, _) = assemble(
            &body("text/plain", "Logo: [cid:logo@x] and [cid:missing@x]"),
            &gif_map(),
        );
        assert!(html.contains("Logo: <img src=\"data:image/gif;base64,R0lG\" /> and [cid:missing@x]"));
    }

    #[test]
    fn test_plain_text_escaped_cid_untouched() {
        let (html, _) = assemble(
            &body("text/plain", "a < b & c\n[cid:logo@x]"),
            &gif_map(),
        );
        assert!(html.contains("a &lt; b &amp; c<br><img src=\"data:image/gif;base64,R0lG\" />"));
    }

    #[test]
    fn test_header_block() {
        let mail = RenderedMail {
            html: String::new(),
            charset: "utf-8".into(),
            subject: "Hi <all>".into(),
            from: Some("\"Ann\" <ann@example.com>".into()),
            to: vec!["a@x".into(), "b@x".into()],
            cc: Vec::new(),
            sent_date: None,
        };
        let block = header_block(&mail);
        assert!(block.contains("<td class=\"header-value\">&quot;Ann&quot; &lt;ann@example.com&gt;</td>"));
        assert!(block.contains("<b>Hi &lt;all&gt;</b>"));
        assert!(block.contains("a@x, b@x"));
        assert!(!block.contains(">Cc<"));
        assert!(!block.contains(">Date<"));
    }

    #[test]
    fn test_insert_header_block() {
        assert_eq!(
            insert_header_block("<html><BODY class=\"x\">text</BODY></html>", "<table/>"),
            "<html><BODY class=\"x\"><table/>text</BODY></html>"
        );
        assert_eq!(insert_header_block("<p>x</p>", "<table/>"), "<table/><p>x</p>");
        assert_eq!(insert_header_block("<p>x</p>", ""), "<p>x</p>");
    }
}
