//! Listing the attachments of a message.

use tracing::debug;

use crate::error::Result;
use crate::model::attachment::Attachment;
use crate::model::part::MimePart;
use crate::render::walk::walk;

/// Collect every attachment in walk order, with its content decoded.
///
/// A part is an attachment when its disposition is `attachment`, or when it
/// has no disposition at all but carries a filename.
pub fn list_attachments(root: &MimePart) -> Result<Vec<Attachment>> {
    let mut attachments = Vec::new();

    walk(root, &mut |part, depth| {
        if part.is_mime_type("multipart/*") || !is_attachment(part) {
            return Ok(());
        }
        let data = part.decoded_body()?;
        debug!(
            depth,
            filename = part.filename().unwrap_or(""),
            content_type = %part.content_type(),
            size = data.len(),
            "Found attachment"
        );
        attachments.push(Attachment {
            filename: part.filename().map(String::from),
            content_type: part.content_type().clone(),
            size: data.len() as u64,
            data,
        });
        Ok(())
    })?;

    Ok(attachments)
}

fn is_attachment(part: &MimePart) -> bool {
    match part.disposition() {
        Some(_) => part.is_attachment(),
        None => part.filename().is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_attachments() {
        let tree = MimePart::multipart(
            "multipart/mixed; boundary=a",
            vec![
                MimePart::leaf("text/plain", "body"),
                MimePart::leaf("application/pdf", "JVBERg==")
                    .with_header("Content-Transfer-Encoding", "base64")
                    .with_header("Content-Disposition", "attachment; filename=\"report.pdf\""),
                MimePart::leaf("image/png; name=\"photo.png\"", "png"),
                MimePart::leaf("image/gif; name=\"logo.gif\"", "gif")
                    .with_header("Content-Disposition", "inline"),
                MimePart::leaf("application/octet-stream", "raw")
                    .with_header("Content-Disposition", "attachment"),
            ],
        );

        let attachments = list_attachments(&tree).unwrap();
        let names: Vec<_> = attachments.iter().map(|a| a.filename.as_deref()).collect();
        assert_eq!(names, vec![Some("report.pdf"), Some("photo.png"), None]);
        assert_eq!(attachments[0].data, b"%PDF");
        assert_eq!(attachments[0].size, 4);
        assert_eq!(attachments[1].content_type.base_type(), "image/png");
    }

    #[test]
    fn test_no_attachments() {
        let tree = MimePart::leaf("text/plain", "just text");
        assert!(list_attachments(&tree).unwrap().is_empty());
    }
}
