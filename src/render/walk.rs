//! Depth-first traversal of a [`MimePart`] tree.

use std::fmt::Write as _;

use crate::error::{RenderError, Result};
use crate::model::part::{Disposition, MimePart};

/// Call `visitor(part, depth)` for `part` and, when it is `multipart/*`,
/// for each child in order. The root has depth 0.
///
/// The first visitor error stops the walk and is returned wrapped in
/// [`RenderError::TreeWalkAborted`].
pub fn walk<F>(part: &MimePart, visitor: &mut F) -> Result<()>
where
    F: FnMut(&MimePart, usize) -> Result<()>,
{
    walk_at(part, 0, visitor)
}

fn walk_at<F>(part: &MimePart, depth: usize, visitor: &mut F) -> Result<()>
where
    F: FnMut(&MimePart, usize) -> Result<()>,
{
    visitor(part, depth).map_err(|source| match source {
        aborted @ RenderError::TreeWalkAborted { .. } => aborted,
        other => RenderError::TreeWalkAborted {
            depth,
            source: Box::new(other),
        },
    })?;

    if part.is_mime_type("multipart/*") {
        for child in part.children() {
            walk_at(child, depth + 1, visitor)?;
        }
    }
    Ok(())
}

/// One line per part: `> ` followed by `|  ` per level, the content type
/// and the disposition, if any.
pub fn print_structure(part: &MimePart) -> String {
    let mut out = String::new();
    let result = walk(part, &mut |p, depth| {
        out.push_str("> ");
        out.push_str(&"|  ".repeat(depth));
        let _ = write!(out, "{}", p.content_type().base_type());
        match p.disposition() {
            Some(Disposition::Inline) => out.push_str("; inline"),
            Some(Disposition::Attachment) => out.push_str("; attachment"),
            Some(Disposition::Other(kind)) => {
                let _ = write!(out, "; {kind}");
            }
            None => {}
        }
        out.push('\n');
        Ok(())
    });
    debug_assert!(result.is_ok());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> MimePart {
        MimePart::multipart(
            "multipart/mixed; boundary=a",
            vec![
                MimePart::multipart(
                    "multipart/alternative; boundary=b",
                    vec![
                        MimePart::leaf("text/plain", "plain"),
                        MimePart::leaf("text/html", "<p>html</p>"),
                    ],
                ),
                MimePart::leaf("application/pdf", "%PDF")
                    .with_header("Content-Disposition", "attachment; filename=a.pdf"),
            ],
        )
    }

    #[test]
    fn test_walk_order_and_depth() {
        let mut seen = Vec::new();
        walk(&sample_tree(), &mut |p, depth| {
            seen.push((p.content_type().base_type(), depth));
            Ok(())
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![
                ("multipart/mixed".to_string(), 0),
                ("multipart/alternative".to_string(), 1),
                ("text/plain".to_string(), 2),
                ("text/html".to_string(), 2),
                ("application/pdf".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_walk_aborts_on_error() {
        let mut visited = 0;
        let err = walk(&sample_tree(), &mut |p, _| {
            visited += 1;
            if p.is_mime_type("text/plain") {
                return Err(RenderError::UnreadablePart {
                    content_type: "text/plain".into(),
                    reason: "boom".into(),
                });
            }
            Ok(())
        })
        .unwrap_err();

        assert_eq!(visited, 3);
        match err {
            RenderError::TreeWalkAborted { depth, source } => {
                assert_eq!(depth, 2);
                assert!(matches!(*source, RenderError::UnreadablePart { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_leaf_root_is_visited_once() {
        let mut count = 0;
        walk(&MimePart::leaf("text/plain", "x"), &mut |_, depth| {
            assert_eq!(depth, 0);
            count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_print_structure() {
        let structure = print_structure(&sample_tree());
        assert_eq!(
            structure,
            "> multipart/mixed\n\
             > |  multipart/alternative\n\
             > |  |  text/plain\n\
             > |  |  text/html\n\
             > |  application/pdf; attachment\n"
        );
    }
}
