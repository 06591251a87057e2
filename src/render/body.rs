//! Choosing the part that becomes the message body.

use tracing::debug;

use crate::error::Result;
use crate::model::mail::BodyCandidate;
use crate::model::part::MimePart;
use crate::render::walk::walk;

/// Find the text that should be rendered as the message body.
///
/// Only non-attachment `text/plain` and `text/html` leaves with non-empty
/// text qualify. A qualifying part replaces the current candidate when the
/// candidate is still empty or the part is HTML, so the first plain part is
/// only a placeholder and the last HTML part in walk order wins.
///
/// Returns the empty `text/plain; charset="utf-8"` candidate when nothing
/// qualifies.
pub fn find_body(root: &MimePart) -> Result<BodyCandidate> {
    let mut candidate = BodyCandidate::default();

    walk(root, &mut |part, depth| {
        if part.is_mime_type("multipart/*") {
            return Ok(());
        }
        let is_html = part.is_mime_type("text/html");
        if !is_html && !part.is_mime_type("text/plain") {
            return Ok(());
        }
        if part.is_attachment() {
            debug!(depth, "Skipping text part with attachment disposition");
            return Ok(());
        }

        let text = part.text_content()?;
        if text.is_empty() {
            return Ok(());
        }

        if candidate.text.is_empty() || is_html {
            debug!(
                depth,
                content_type = %part.content_type(),
                "Using part as message body"
            );
            candidate = BodyCandidate {
                text,
                content_type: part.content_type().clone(),
            };
        }
        Ok(())
    })?;

    Ok(candidate)
}
