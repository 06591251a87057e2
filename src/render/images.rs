//! Collecting images referenced by `Content-Id`.

use tracing::debug;

use crate::error::Result;
use crate::model::mail::{InlineImage, InlineImageMap};
use crate::model::part::MimePart;
use crate::parser::transfer::encode_base64;
use crate::render::walk::walk;

/// Map every `image/*` part with a `Content-Id` header to its base64 data.
///
/// Keys are the header value as sent, angle brackets included. When two
/// parts share an id the first one wins.
pub fn find_inline_images(root: &MimePart) -> Result<InlineImageMap> {
    let mut images = InlineImageMap::new();

    walk(root, &mut |part, _depth| {
        if !part.is_mime_type("image/*") {
            return Ok(());
        }
        let Some(content_id) = part.content_id() else {
            return Ok(());
        };
        if images.contains_key(content_id) {
            debug!(content_id, "Duplicate Content-Id, keeping the first image");
            return Ok(());
        }

        let data = part.decoded_body()?;
        images.insert(
            content_id.to_string(),
            InlineImage {
                base64: encode_base64(&data),
                content_type: part.content_type().clone(),
            },
        );
        Ok(())
    })?;

    debug!(count = images.len(), "Collected inline images");
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_by_bracketed_content_id() {
        let tree = MimePart::multipart(
            "multipart/related; boundary=r",
            vec![
                MimePart::leaf("text/html", "<img src=\"cid:part1.A@B\">"),
                MimePart::leaf("image/gif", "R0lGODlhAQABAAAAACw=")
                    .with_header("Content-Transfer-Encoding", "base64")
                    .with_header("Content-ID", "<part1.A@B>"),
            ],
        );
        let images = find_inline_images(&tree).unwrap();
        assert_eq!(images.len(), 1);
        let image = &images["<part1.A@B>"];
        assert_eq!(image.base64, "R0lGODlhAQABAAAAACw=");
        assert_eq!(image.content_type.base_type(), "image/gif");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let tree = MimePart::multipart(
            "multipart/related; boundary=r",
            vec![
                MimePart::leaf("image/png", "first").with_header("Content-Id", "<same>"),
                MimePart::leaf("image/png", "second").with_header("Content-Id", "<same>"),
            ],
        );
        let images = find_inline_images(&tree).unwrap();
        assert_eq!(images["<same>"].base64, encode_base64(b"first"));
    }

    #[test]
    fn test_ignores_non_images_and_missing_ids() {
        let tree = MimePart::multipart(
            "multipart/related; boundary=r",
            vec![
                MimePart::leaf("application/pdf", "pdf").with_header("Content-Id", "<doc>"),
                MimePart::leaf("image/png", "png"),
            ],
        );
        assert!(find_inline_images(&tree).unwrap().is_empty());
    }
}
