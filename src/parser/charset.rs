//! Known character sets, their aliases, and the `encoding_rs` codec behind each.

use std::borrow::Cow;

use encoding_rs::Encoding;

/// Charset assumed whenever a text part declares none or an unknown one.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// A charset this crate can decode, identified by its canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    name: &'static str,
    encoding: &'static Encoding,
}

/// Canonical name, aliases, and the WHATWG label used to obtain the codec.
///
/// Sorted case-insensitively by canonical name.
const KNOWN_CHARSETS: &[(&str, &[&str], &str)] = &[
    ("Big5", &["csbig5", "big5-hkscs"], "big5"),
    ("EUC-JP", &["eucjis", "x-euc-jp", "csEUCPkdFmtjapanese"], "euc-jp"),
    ("EUC-KR", &["ksc5601", "ks_c_5601-1987", "5601", "cseuckr"], "euc-kr"),
    ("GB18030", &["gb18030-2000"], "gb18030"),
    ("GB2312", &["euc-cn", "x-euc-cn", "gb2312-80", "csgb2312"], "gb2312"),
    ("GBK", &["cp936", "windows-936"], "gbk"),
    ("IBM866", &["cp866", "ibm-866", "csibm866"], "ibm866"),
    ("ISO-2022-JP", &["iso2022jp", "jis", "csjisencoding"], "iso-2022-jp"),
    ("ISO-8859-1", &["iso8859_1", "iso_8859_1", "iso8859-1", "iso_8859-1", "latin1", "ibm819", "cp819", "csisolatin1"], "iso-8859-1"),
    ("ISO-8859-13", &["iso8859_13", "iso_8859-13", "latin7"], "iso-8859-13"),
    ("ISO-8859-15", &["iso8859_15", "iso_8859-15", "latin9", "latin0"], "iso-8859-15"),
    ("ISO-8859-16", &["iso8859_16", "iso_8859-16", "latin10"], "iso-8859-16"),
    ("ISO-8859-2", &["iso8859_2", "iso_8859-2", "latin2", "csisolatin2"], "iso-8859-2"),
    ("ISO-8859-3", &["iso8859_3", "iso_8859-3", "latin3"], "iso-8859-3"),
    ("ISO-8859-4", &["iso8859_4", "iso_8859-4", "latin4"], "iso-8859-4"),
    ("ISO-8859-5", &["iso8859_5", "iso_8859-5", "cyrillic"], "iso-8859-5"),
    ("ISO-8859-6", &["iso8859_6", "iso_8859-6", "arabic"], "iso-8859-6"),
    ("ISO-8859-7", &["iso8859_7", "iso_8859-7", "greek8", "ecma-118"], "iso-8859-7"),
    ("ISO-8859-8", &["iso8859_8", "iso_8859-8", "hebrew"], "iso-8859-8"),
    ("ISO-8859-9", &["iso8859_9", "iso_8859-9", "latin5"], "iso-8859-9"),
    ("KOI8-R", &["koi8_r", "cskoi8r"], "koi8-r"),
    ("KOI8-U", &["koi8_u"], "koi8-u"),
    ("Shift_JIS", &["shift-jis", "sjis", "ms_kanji", "x-sjis", "csshiftjis"], "shift_jis"),
    ("US-ASCII", &["ascii", "iso646-us", "ansi_x3.4-1968", "us-ascii"], "us-ascii"),
    ("UTF-16", &["utf16", "unicode", "unicodebig"], "utf-16be"),
    ("UTF-16BE", &["utf_16be", "x-utf-16be", "unicodebigunmarked"], "utf-16be"),
    ("UTF-16LE", &["utf_16le", "x-utf-16le", "unicodelittleunmarked"], "utf-16le"),
    ("UTF-8", &["utf8", "unicode-1-1-utf-8"], "utf-8"),
    ("windows-1250", &["cp1250", "cp-1250"], "windows-1250"),
    ("windows-1251", &["cp1251", "cp-1251"], "windows-1251"),
    ("windows-1252", &["cp1252", "cp-1252"], "windows-1252"),
    ("windows-1253", &["cp1253", "cp-1253"], "windows-1253"),
    ("windows-1254", &["cp1254", "cp-1254"], "windows-1254"),
    ("windows-1255", &["cp1255", "cp-1255"], "windows-1255"),
    ("windows-1256", &["cp1256", "cp-1256"], "windows-1256"),
    ("windows-1257", &["cp1257", "cp-1257"], "windows-1257"),
    ("windows-1258", &["cp1258", "cp-1258"], "windows-1258"),
    ("windows-874", &["cp874", "tis-620", "x-windows-874"], "windows-874"),
    ("x-MacCyrillic", &["maccyrillic", "x-mac-cyrillic"], "x-mac-cyrillic"),
    ("x-MacRoman", &["macroman", "macintosh", "x-mac-roman"], "macintosh"),
];

impl Charset {
    pub fn utf8() -> Self {
        Self {
            name: "UTF-8",
            encoding: encoding_rs::UTF_8,
        }
    }

    /// Resolve a charset name or alias (case-insensitive, surrounding
    /// whitespace and quotes ignored).
    ///
    /// Falls back to the WHATWG label registry for names this crate does not
    /// list explicitly. Labels that map to the WHATWG "replacement" encoding
    /// are not considered known.
    pub fn for_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches(|c| c == '"' || c == '\'');
        if label.is_empty() {
            return None;
        }

        let known = KNOWN_CHARSETS.iter().find(|(name, aliases, _)| {
            name.eq_ignore_ascii_case(label) || aliases.iter().any(|a| a.eq_ignore_ascii_case(label))
        });
        if let Some(&(name, _, codec)) = known {
            return Encoding::for_label(codec.as_bytes()).map(|encoding| Self { name, encoding });
        }

        Encoding::for_label(label.as_bytes())
            .filter(|encoding| *encoding != encoding_rs::REPLACEMENT)
            .map(|encoding| Self {
                name: encoding.name(),
                encoding,
            })
    }

    /// Find a charset mentioned anywhere in `haystack`.
    ///
    /// Canonical names are searched first, then aliases. Within each pass the
    /// longest match wins, so `iso-8859-15` is not mistaken for `iso-8859-1`.
    pub fn find_in(haystack: &str) -> Option<Self> {
        let haystack = haystack.to_lowercase();

        let by_name = KNOWN_CHARSETS
            .iter()
            .filter(|(name, _, _)| haystack.contains(&name.to_lowercase()))
            .max_by_key(|(name, _, _)| name.len());
        if let Some((name, _, _)) = by_name {
            return Self::for_label(name);
        }

        KNOWN_CHARSETS
            .iter()
            .flat_map(|(name, aliases, _)| aliases.iter().map(move |alias| (*name, *alias)))
            .filter(|(_, alias)| haystack.contains(&alias.to_lowercase()))
            .max_by_key(|(_, alias)| alias.len())
            .and_then(|(name, _)| Self::for_label(name))
    }

    /// The canonical name, e.g. `ISO-8859-1`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Decode bytes into text, honoring a byte order mark if present.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (text, _, had_errors) = self.encoding.decode(bytes);
        if had_errors {
            tracing::debug!(charset = self.name, "Malformed sequences replaced while decoding");
        }
        text
    }

    /// Encode text in this charset.
    ///
    /// UTF-16 variants are written with a byte order mark; other charsets
    /// replace unmappable characters with numeric character references.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        if self.encoding == encoding_rs::UTF_16BE {
            return std::iter::once('\u{feff}' as u16)
                .chain(text.encode_utf16())
                .flat_map(u16::to_be_bytes)
                .collect();
        }
        if self.encoding == encoding_rs::UTF_16LE {
            return std::iter::once('\u{feff}' as u16)
                .chain(text.encode_utf16())
                .flat_map(u16::to_le_bytes)
                .collect();
        }
        let (bytes, _, _) = self.encoding.encode(text);
        bytes.into_owned()
    }
}

/// Decode `bytes` with the named charset, or as (lossy) UTF-8 when the name is unknown.
pub fn decode_or_utf8<'a>(label: Option<&str>, bytes: &'a [u8]) -> Cow<'a, str> {
    match label.and_then(Charset::for_label) {
        Some(charset) => charset.decode(bytes),
        None => {
            tracing::debug!(
                charset = label.unwrap_or_default(),
                "Unknown charset, reading content as UTF-8"
            );
            String::from_utf8_lossy(bytes)
        }
    }
}
