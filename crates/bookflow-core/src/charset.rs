//! Codepage service: byte-to-Unicode tables and charset sniffing.
//!
//! The windowed reader treats this as an opaque capability behind
//! [`CodepageProvider`]: given a charset name it wants the upper-half
//! translation table, and given a raw byte window it wants a best-guess
//! charset and language. [`BuiltinCodepages`] covers the codepages that
//! matter for the supported book corpora: windows-1252, windows-1251,
//! koi8-r and iso-8859-1.

/// Result of charset autodetection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedEncoding {
    /// Detected charset name, normalised (e.g. `utf-8`, `windows-1251`).
    pub charset: String,
    /// Best-guess language tag, empty when undecidable.
    pub language: String,
}

/// Charset lookup and detection capability.
pub trait CodepageProvider {
    /// Returns the 128-entry table mapping bytes `0x80..=0xFF` to Unicode,
    /// or `None` when the charset is unknown or not an 8-bit codepage.
    fn lookup_table(&self, name: &str) -> Option<[char; 128]>;

    /// Guesses the charset of a raw byte window.
    fn autodetect(&self, buf: &[u8]) -> Option<DetectedEncoding>;
}

/// Upper half of windows-1252 (WHATWG index).
const WINDOWS_1252: [char; 128] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
    '\u{00A0}', '\u{00A1}', '\u{00A2}', '\u{00A3}', '\u{00A4}', '\u{00A5}', '\u{00A6}', '\u{00A7}',
    '\u{00A8}', '\u{00A9}', '\u{00AA}', '\u{00AB}', '\u{00AC}', '\u{00AD}', '\u{00AE}', '\u{00AF}',
    '\u{00B0}', '\u{00B1}', '\u{00B2}', '\u{00B3}', '\u{00B4}', '\u{00B5}', '\u{00B6}', '\u{00B7}',
    '\u{00B8}', '\u{00B9}', '\u{00BA}', '\u{00BB}', '\u{00BC}', '\u{00BD}', '\u{00BE}', '\u{00BF}',
    '\u{00C0}', '\u{00C1}', '\u{00C2}', '\u{00C3}', '\u{00C4}', '\u{00C5}', '\u{00C6}', '\u{00C7}',
    '\u{00C8}', '\u{00C9}', '\u{00CA}', '\u{00CB}', '\u{00CC}', '\u{00CD}', '\u{00CE}', '\u{00CF}',
    '\u{00D0}', '\u{00D1}', '\u{00D2}', '\u{00D3}', '\u{00D4}', '\u{00D5}', '\u{00D6}', '\u{00D7}',
    '\u{00D8}', '\u{00D9}', '\u{00DA}', '\u{00DB}', '\u{00DC}', '\u{00DD}', '\u{00DE}', '\u{00DF}',
    '\u{00E0}', '\u{00E1}', '\u{00E2}', '\u{00E3}', '\u{00E4}', '\u{00E5}', '\u{00E6}', '\u{00E7}',
    '\u{00E8}', '\u{00E9}', '\u{00EA}', '\u{00EB}', '\u{00EC}', '\u{00ED}', '\u{00EE}', '\u{00EF}',
    '\u{00F0}', '\u{00F1}', '\u{00F2}', '\u{00F3}', '\u{00F4}', '\u{00F5}', '\u{00F6}', '\u{00F7}',
    '\u{00F8}', '\u{00F9}', '\u{00FA}', '\u{00FB}', '\u{00FC}', '\u{00FD}', '\u{00FE}', '\u{00FF}',
];

/// Upper half of windows-1251 (WHATWG index).
const WINDOWS_1251: [char; 128] = [
    '\u{0402}', '\u{0403}', '\u{201A}', '\u{0453}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{20AC}', '\u{2030}', '\u{0409}', '\u{2039}', '\u{040A}', '\u{040C}', '\u{040B}', '\u{040F}',
    '\u{0452}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{0098}', '\u{2122}', '\u{0459}', '\u{203A}', '\u{045A}', '\u{045C}', '\u{045B}', '\u{045F}',
    '\u{00A0}', '\u{040E}', '\u{045E}', '\u{0408}', '\u{00A4}', '\u{0490}', '\u{00A6}', '\u{00A7}',
    '\u{0401}', '\u{00A9}', '\u{0404}', '\u{00AB}', '\u{00AC}', '\u{00AD}', '\u{00AE}', '\u{0407}',
    '\u{00B0}', '\u{00B1}', '\u{0406}', '\u{0456}', '\u{0491}', '\u{00B5}', '\u{00B6}', '\u{00B7}',
    '\u{0451}', '\u{2116}', '\u{0454}', '\u{00BB}', '\u{0458}', '\u{0405}', '\u{0455}', '\u{0457}',
    '\u{0410}', '\u{0411}', '\u{0412}', '\u{0413}', '\u{0414}', '\u{0415}', '\u{0416}', '\u{0417}',
    '\u{0418}', '\u{0419}', '\u{041A}', '\u{041B}', '\u{041C}', '\u{041D}', '\u{041E}', '\u{041F}',
    '\u{0420}', '\u{0421}', '\u{0422}', '\u{0423}', '\u{0424}', '\u{0425}', '\u{0426}', '\u{0427}',
    '\u{0428}', '\u{0429}', '\u{042A}', '\u{042B}', '\u{042C}', '\u{042D}', '\u{042E}', '\u{042F}',
    '\u{0430}', '\u{0431}', '\u{0432}', '\u{0433}', '\u{0434}', '\u{0435}', '\u{0436}', '\u{0437}',
    '\u{0438}', '\u{0439}', '\u{043A}', '\u{043B}', '\u{043C}', '\u{043D}', '\u{043E}', '\u{043F}',
    '\u{0440}', '\u{0441}', '\u{0442}', '\u{0443}', '\u{0444}', '\u{0445}', '\u{0446}', '\u{0447}',
    '\u{0448}', '\u{0449}', '\u{044A}', '\u{044B}', '\u{044C}', '\u{044D}', '\u{044E}', '\u{044F}',
];

/// Upper half of koi8-r (RFC 1489).
const KOI8_R: [char; 128] = [
    '\u{2500}', '\u{2502}', '\u{250C}', '\u{2510}', '\u{2514}', '\u{2518}', '\u{251C}', '\u{2524}',
    '\u{252C}', '\u{2534}', '\u{253C}', '\u{2580}', '\u{2584}', '\u{2588}', '\u{258C}', '\u{2590}',
    '\u{2591}', '\u{2592}', '\u{2593}', '\u{2320}', '\u{25A0}', '\u{2219}', '\u{221A}', '\u{2248}',
    '\u{2264}', '\u{2265}', '\u{00A0}', '\u{2321}', '\u{00B0}', '\u{00B2}', '\u{00B7}', '\u{00F7}',
    '\u{2550}', '\u{2551}', '\u{2552}', '\u{0451}', '\u{2553}', '\u{2554}', '\u{2555}', '\u{2556}',
    '\u{2557}', '\u{2558}', '\u{2559}', '\u{255A}', '\u{255B}', '\u{255C}', '\u{255D}', '\u{255E}',
    '\u{255F}', '\u{2560}', '\u{2561}', '\u{0401}', '\u{2562}', '\u{2563}', '\u{2564}', '\u{2565}',
    '\u{2566}', '\u{2567}', '\u{2568}', '\u{2569}', '\u{256A}', '\u{256B}', '\u{256C}', '\u{00A9}',
    '\u{044E}', '\u{0430}', '\u{0431}', '\u{0446}', '\u{0434}', '\u{0435}', '\u{0444}', '\u{0433}',
    '\u{0445}', '\u{0438}', '\u{0439}', '\u{043A}', '\u{043B}', '\u{043C}', '\u{043D}', '\u{043E}',
    '\u{043F}', '\u{044F}', '\u{0440}', '\u{0441}', '\u{0442}', '\u{0443}', '\u{0436}', '\u{0432}',
    '\u{044C}', '\u{044B}', '\u{0437}', '\u{0448}', '\u{044D}', '\u{0449}', '\u{0447}', '\u{044A}',
    '\u{042E}', '\u{0410}', '\u{0411}', '\u{0426}', '\u{0414}', '\u{0415}', '\u{0424}', '\u{0413}',
    '\u{0425}', '\u{0418}', '\u{0419}', '\u{041A}', '\u{041B}', '\u{041C}', '\u{041D}', '\u{041E}',
    '\u{041F}', '\u{042F}', '\u{0420}', '\u{0421}', '\u{0422}', '\u{0423}', '\u{0416}', '\u{0412}',
    '\u{042C}', '\u{042B}', '\u{0417}', '\u{0428}', '\u{042D}', '\u{0429}', '\u{0427}', '\u{042A}',
];

/// Builtin provider: a handful of codepages plus a BOM/heuristic detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuiltinCodepages;

impl BuiltinCodepages {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Strips punctuation variation out of a charset name: lowercased, with
/// `_`/space folded to `-`.
fn normalize_name(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .replace(['_', ' '], "-")
}

impl CodepageProvider for BuiltinCodepages {
    fn lookup_table(&self, name: &str) -> Option<[char; 128]> {
        match normalize_name(name).as_str() {
            "windows-1252" | "cp1252" | "cp-1252" => Some(WINDOWS_1252),
            "windows-1251" | "cp1251" | "cp-1251" => Some(WINDOWS_1251),
            "koi8-r" | "koi8" => Some(KOI8_R),
            "iso-8859-1" | "latin-1" | "latin1" | "8859-1" => {
                // Latin-1 upper half is the identity mapping.
                let mut table = ['\0'; 128];
                for (i, slot) in table.iter_mut().enumerate() {
                    *slot = char::from_u32(0x80 + i as u32).unwrap_or('\u{FFFD}');
                }
                Some(table)
            }
            _ => None,
        }
    }

    fn autodetect(&self, buf: &[u8]) -> Option<DetectedEncoding> {
        if buf.is_empty() {
            return None;
        }
        if let Some(by_bom) = detect_bom(buf) {
            return Some(DetectedEncoding {
                charset: by_bom.to_string(),
                language: String::new(),
            });
        }

        let stats = ByteStats::scan(buf);
        if stats.high == 0 || stats.utf8_valid {
            return Some(DetectedEncoding {
                charset: "utf-8".to_string(),
                language: if stats.high == 0 {
                    "en".to_string()
                } else {
                    String::new()
                },
            });
        }

        // 8-bit text. Dense high-byte usage points at Cyrillic; the letter
        // rows then separate windows-1251 (lowercase at 0xE0..) from koi8-r
        // (lowercase at 0xC0..0xDF).
        if stats.high * 8 >= buf.len() {
            let charset = if stats.row_e0_ff >= stats.row_c0_df {
                "windows-1251"
            } else {
                "koi8-r"
            };
            return Some(DetectedEncoding {
                charset: charset.to_string(),
                language: "ru".to_string(),
            });
        }
        Some(DetectedEncoding {
            charset: "windows-1252".to_string(),
            language: "en".to_string(),
        })
    }
}

/// BOM sniffing. UTF-32 first: its little-endian BOM starts with the UTF-16
/// one.
fn detect_bom(buf: &[u8]) -> Option<&'static str> {
    if buf.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
        Some("utf-32le")
    } else if buf.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
        Some("utf-32be")
    } else if buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Some("utf-8")
    } else if buf.starts_with(&[0xFF, 0xFE]) {
        Some("utf-16le")
    } else if buf.starts_with(&[0xFE, 0xFF]) {
        Some("utf-16be")
    } else {
        None
    }
}

struct ByteStats {
    high: usize,
    row_c0_df: usize,
    row_e0_ff: usize,
    utf8_valid: bool,
}

impl ByteStats {
    fn scan(buf: &[u8]) -> Self {
        let mut stats = Self {
            high: 0,
            row_c0_df: 0,
            row_e0_ff: 0,
            utf8_valid: true,
        };
        let mut continuations = 0u8;
        for &b in buf {
            if b >= 0x80 {
                stats.high += 1;
            }
            match b {
                0xC0..=0xDF => stats.row_c0_df += 1,
                0xE0..=0xFF => stats.row_e0_ff += 1,
                _ => {}
            }
            // UTF-8 shape check, tolerant of truncation at the window tail.
            if continuations > 0 {
                if b & 0xC0 == 0x80 {
                    continuations -= 1;
                } else {
                    stats.utf8_valid = false;
                    continuations = 0;
                }
            } else if b >= 0x80 {
                continuations = match b {
                    0xC2..=0xDF => 1,
                    0xE0..=0xEF => 2,
                    0xF0..=0xF4 => 3,
                    _ => {
                        stats.utf8_valid = false;
                        0
                    }
                };
            }
        }
        if stats.high == 0 {
            stats.utf8_valid = false; // plain ASCII, not "multibyte UTF-8"
        }
        stats
    }
}
