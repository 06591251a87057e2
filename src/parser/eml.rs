//! Loading individual `.eml` files (RFC 5322 messages, optionally with a
//! leading mbox `From ` line).

use std::path::Path;

use tracing::debug;

use crate::error::{RenderError, Result};
use crate::model::part::MimePart;
use crate::parser::tree::{parse_message, ParserOptions};

/// Read the raw bytes of an `.eml` file.
pub fn read_eml(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RenderError::FileNotFound(path.to_path_buf())
        } else {
            RenderError::io(path, e)
        }
    })
}

/// Read an `.eml` file and parse it into a [`MimePart`] tree.
pub fn load_message(path: impl AsRef<Path>, options: &ParserOptions) -> Result<MimePart> {
    let path = path.as_ref();
    let data = read_eml(path)?;
    debug!(path = %path.display(), bytes = data.len(), "Parsing message");
    Ok(parse_message(&data, options))
}
