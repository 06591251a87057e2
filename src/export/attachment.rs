//! Write extracted attachments to a directory.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::model::attachment::Attachment;
use crate::model::content_type::ContentType;

use super::filename::{sanitize_with, FilenamePolicy, FilenameRegistry};

/// How attachment names are made safe.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Substitute for characters the filesystem does not allow.
    pub replacement_char: char,
    pub policy: FilenamePolicy,
    /// Prefix of generated names for attachments without a usable one.
    pub nameless_prefix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            replacement_char: '_',
            policy: FilenamePolicy::host(),
            nameless_prefix: "nameless-".to_string(),
        }
    }
}

/// Write every attachment into `output_dir`, creating it if needed.
///
/// Names are sanitized and made unique, both among the attachments and
/// against files already in the directory. An attachment that cannot be
/// written is logged and skipped. Returns the paths written.
pub fn export_attachments(
    attachments: &[Attachment],
    output_dir: &Path,
    options: &ExportOptions,
) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating attachment directory {}", output_dir.display()))?;
    info!(dir = %output_dir.display(), count = attachments.len(), "Extracting attachments");

    let mut registry = FilenameRegistry::new();
    let mut nameless = 0usize;
    let mut paths = Vec::new();

    for (i, attachment) in attachments.iter().enumerate() {
        let name = match safe_name(attachment, options) {
            Some(name) => name,
            None => {
                nameless += 1;
                let name = format!(
                    "{}{nameless}{}",
                    options.nameless_prefix,
                    guess_extension(&attachment.content_type)
                );
                debug!(index = i, name = %name, "Attachment has no usable name, generated one");
                name
            }
        };

        let mut path = output_dir.join(registry.unique(&name));
        while path.exists() {
            path = output_dir.join(registry.unique(&name));
        }

        match std::fs::write(&path, &attachment.data) {
            Ok(()) => {
                debug!(index = i, path = %path.display(), size = attachment.size, "Saved attachment");
                paths.push(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to export attachment");
            }
        }
    }

    Ok(paths)
}

fn safe_name(attachment: &Attachment, options: &ExportOptions) -> Option<String> {
    let original = attachment.filename.as_deref()?;
    match sanitize_with(original, options.replacement_char, options.policy) {
        Ok(name) if !name.is_empty() && name != "." && name != ".." => Some(name),
        Ok(_) => None,
        Err(e) => {
            debug!(filename = original, error = %e, "Could not sanitize attachment name");
            None
        }
    }
}

/// A file extension (with the dot) registered for the content type, else `""`.
///
/// The extension named after the subtype wins (`image/jpeg` gives `.jpeg`),
/// then `txt`, then whatever `mime_guess` lists first.
fn guess_extension(content_type: &ContentType) -> String {
    let Some(extensions) = mime_guess::get_mime_extensions_str(&content_type.base_type()) else {
        return String::new();
    };
    let subtype = content_type.sub_type();
    extensions
        .iter()
        .find(|ext| ext.eq_ignore_ascii_case(subtype))
        .or_else(|| extensions.iter().find(|ext| **ext == "txt"))
        .or_else(|| extensions.first())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}
