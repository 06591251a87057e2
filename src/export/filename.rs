//! Making attachment filenames safe to write on the host filesystem.

use std::collections::HashMap;

use thiserror::Error;

/// Which filesystem rules a sanitized name has to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenamePolicy {
    /// Replace `< > : " / \ | ? *` and guard the reserved device names.
    Windows,
    /// Replace `/` only.
    Unix,
}

const WINDOWS_ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

impl FilenamePolicy {
    /// The policy of the operating system this binary was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// `"windows"`, `"unix"` or `"host"` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "host" => Some(Self::host()),
            "windows" => Some(Self::Windows),
            "unix" => Some(Self::Unix),
            _ => None,
        }
    }

    fn is_illegal(self, c: char) -> bool {
        match self {
            Self::Windows => WINDOWS_ILLEGAL.contains(&c),
            Self::Unix => c == '/',
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("Sanitized file name cannot be empty")]
    EmptyResult,
}

/// Sanitize `name` for the host filesystem.
pub fn sanitize(name: &str, replacement: char) -> Result<String, SanitizeError> {
    sanitize_with(name, replacement, FilenamePolicy::host())
}

/// Replace characters `policy` forbids with `replacement`.
///
/// An empty name is returned as is. Windows device names come back
/// upper-cased between underscores (`prn` becomes `_PRN_`).
pub fn sanitize_with(
    name: &str,
    replacement: char,
    policy: FilenamePolicy,
) -> Result<String, SanitizeError> {
    if name.is_empty() {
        return Ok(String::new());
    }

    let mut sanitized: String = name
        .chars()
        .map(|c| if policy.is_illegal(c) { replacement } else { c })
        .collect();

    if policy == FilenamePolicy::Windows {
        let upper = sanitized.to_uppercase();
        if WINDOWS_RESERVED.contains(&upper.as_str()) {
            sanitized = format!("_{upper}_");
        }
    }

    if sanitized.is_empty() {
        return Err(SanitizeError::EmptyResult);
    }
    Ok(sanitized)
}

/// Hands out unique filenames within one extraction.
///
/// The first request for a name returns it unchanged; later ones get
/// ` (2)`, ` (3)`… inserted before the extension.
#[derive(Debug, Default)]
pub struct FilenameRegistry {
    next_counter: HashMap<String, u32>,
}

impl FilenameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a unique variant of `name`.
    pub fn unique(&mut self, name: &str) -> String {
        if !self.next_counter.contains_key(name) {
            self.next_counter.insert(name.to_string(), 2);
            return name.to_string();
        }
        loop {
            let counter = self.next_counter.entry(name.to_string()).or_insert(2);
            let candidate = numbered(name, *counter);
            *counter += 1;
            if !self.next_counter.contains_key(&candidate) {
                self.next_counter.insert(candidate.clone(), 2);
                return candidate;
            }
        }
    }

    /// `true` when `name` has been handed out already.
    pub fn contains(&self, name: &str) -> bool {
        self.next_counter.contains_key(name)
    }
}

/// `report.pdf` → `report (n).pdf`; names without extension get the suffix at the end.
fn numbered(name: &str, n: u32) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({n}){}", &name[..dot], &name[dot..]),
        _ => format!("{name} ({n})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_characters_windows() {
        assert_eq!(
            sanitize_with("illegal:/\\*?\"<>|.txt", '_', FilenamePolicy::Windows).unwrap(),
            "illegal_________.txt"
        );
    }

    #[test]
    fn test_illegal_characters_unix() {
        assert_eq!(
            sanitize_with("illegal:/\\*?\"<>|.txt", '_', FilenamePolicy::Unix).unwrap(),
            "illegal:_\\*?\"<>|.txt"
        );
    }

    #[test]
    fn test_reserved_names() {
        assert_eq!(sanitize_with("CON", '_', FilenamePolicy::Windows).unwrap(), "_CON_");
        assert_eq!(sanitize_with("prn", '_', FilenamePolicy::Windows).unwrap(), "_PRN_");
        assert_eq!(sanitize_with("lpt9", '_', FilenamePolicy::Windows).unwrap(), "_LPT9_");
        assert_eq!(sanitize_with("CON", '_', FilenamePolicy::Unix).unwrap(), "CON");
        assert_eq!(sanitize_with("CON.txt", '_', FilenamePolicy::Windows).unwrap(), "CON.txt");
    }

    #[test]
    fn test_valid_name_unchanged() {
        assert_eq!(sanitize("valid_filename.txt", '_').unwrap(), "valid_filename.txt");
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(sanitize_with("", '_', FilenamePolicy::Windows).unwrap(), "");
    }

    #[test]
    fn test_policy_from_name() {
        assert_eq!(FilenamePolicy::from_name("Windows"), Some(FilenamePolicy::Windows));
        assert_eq!(FilenamePolicy::from_name("unix"), Some(FilenamePolicy::Unix));
        assert_eq!(FilenamePolicy::from_name("host"), Some(FilenamePolicy::host()));
        assert_eq!(FilenamePolicy::from_name("amiga"), None);
    }

    #[test]
    fn test_registry_deduplicates() {
        let mut registry = FilenameRegistry::new();
        assert_eq!(registry.unique("report.pdf"), "report.pdf");
        assert_eq!(registry.unique("report.pdf"), "report (2).pdf");
        assert_eq!(registry.unique("report.pdf"), "report (3).pdf");
        assert_eq!(registry.unique("notes"), "notes");
        assert_eq!(registry.unique("notes"), "notes (2)");
        assert!(registry.contains("report (2).pdf"));
    }

    #[test]
    fn test_registry_skips_generated_collisions() {
        let mut registry = FilenameRegistry::new();
        assert_eq!(registry.unique("a (2).txt"), "a (2).txt");
        assert_eq!(registry.unique("a.txt"), "a.txt");
        assert_eq!(registry.unique("a.txt"), "a (3).txt");
    }

    #[test]
    fn test_numbered_hidden_file() {
        assert_eq!(numbered(".bashrc", 2), ".bashrc (2)");
        assert_eq!(numbered("archive.tar.gz", 2), "archive.tar (2).gz");
    }
}
