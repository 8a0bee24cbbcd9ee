//! Windowed stream reader with on-the-fly decoding.
//!
//! [`WindowedReader`] presents a character cursor over a seekable byte
//! stream. It keeps a resizable byte window anchored at `buf_fpos`, decodes
//! one code point at a time under the currently selected [`Encoding`], and
//! never raises: I/O failures become short reads and callers observe end of
//! input through [`WindowedReader::eof`].
//!
//! Position invariant: `buf_fpos + buf_pos` is the absolute offset of the
//! next character to decode, and `buf_fpos + buf_len` never exceeds the
//! stream size.

use log::debug;

use bookflow_core::{BookStream, BuiltinCodepages, CodepageProvider};

use crate::error::{IngestError, Result};

/// Window growth quantum and the smallest window a seek will set up.
pub(crate) const BUF_SIZE_INCREMENT: usize = 4096;
/// Refill threshold: parsers top the window up when fewer bytes remain.
pub(crate) const MIN_BUF_DATA_SIZE: usize = 2048;
/// Guard bytes past the logical capacity, for multi-byte lookahead at the
/// window tail.
const BUF_GUARD_BYTES: usize = 16;
/// How much of the stream head charset autodetection examines.
const AUTODETECT_PROBE_SIZE: usize = 0x10000;
/// Autodetection refuses to guess on less input than this.
const AUTODETECT_MIN_BYTES: usize = 40;

/// Character encodings the reader can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Single-byte codepage, optionally translated through a 128-entry table.
    #[default]
    Codepage,
    /// UTF-8, restricted to one-, two- and three-byte sequences.
    Utf8,
    /// UTF-16 big-endian code units; surrogate pairs are not combined.
    Utf16Be,
    /// UTF-16 little-endian code units; surrogate pairs are not combined.
    Utf16Le,
    /// UTF-32 big-endian; only the low 16 bits of each unit are kept.
    Utf32Be,
    /// UTF-32 little-endian; only the low 16 bits of each unit are kept.
    Utf32Le,
}

/// One logical line as returned by [`WindowedReader::read_line`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLine {
    /// Decoded text, without the line terminator.
    pub text: String,
    /// Absolute byte offset of the first byte of the line.
    pub fpos: u64,
    /// Encoded byte length, including the consumed terminator.
    pub fsize: u64,
    /// True when the line ended at an end-of-line (or end of stream) rather
    /// than at the length cap.
    pub eol: bool,
}

/// Sliding-window character cursor over a [`BookStream`].
pub struct WindowedReader {
    stream: Box<dyn BookStream>,
    codepages: Box<dyn CodepageProvider>,
    buf: Vec<u8>,
    /// Logical capacity; the allocation carries [`BUF_GUARD_BYTES`] more.
    buf_size: usize,
    buf_len: usize,
    buf_pos: usize,
    buf_fpos: u64,
    stream_size: u64,
    encoding: Encoding,
    conv_table: Option<Box<[char; 128]>>,
    encoding_name: String,
    lang_name: String,
}

impl std::fmt::Debug for WindowedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowedReader")
            .field("buf_fpos", &self.buf_fpos)
            .field("buf_pos", &self.buf_pos)
            .field("buf_len", &self.buf_len)
            .field("stream_size", &self.stream_size)
            .field("encoding", &self.encoding)
            .field("encoding_name", &self.encoding_name)
            .finish()
    }
}

impl WindowedReader {
    /// Creates a reader over `stream` using the builtin codepage tables.
    #[must_use]
    pub fn new(stream: Box<dyn BookStream>) -> Self {
        Self::with_codepages(stream, Box::new(BuiltinCodepages::new()))
    }

    /// Creates a reader with a caller-supplied codepage service.
    #[must_use]
    pub fn with_codepages(
        stream: Box<dyn BookStream>,
        codepages: Box<dyn CodepageProvider>,
    ) -> Self {
        let stream_size = stream.size();
        Self {
            stream,
            codepages,
            buf: Vec::new(),
            buf_size: 0,
            buf_len: 0,
            buf_pos: 0,
            buf_fpos: 0,
            stream_size,
            encoding: Encoding::Codepage,
            conv_table: None,
            encoding_name: String::new(),
            lang_name: String::new(),
        }
    }

    /// Absolute position of the next character to decode.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.buf_fpos + self.buf_pos as u64
    }

    /// Size of the underlying stream, as cached at construction or
    /// [`WindowedReader::reset`].
    #[must_use]
    pub const fn stream_size(&self) -> u64 {
        self.stream_size
    }

    /// True when every byte of the stream has been consumed.
    #[must_use]
    pub fn eof(&self) -> bool {
        self.position() >= self.stream_size
    }

    /// Currently selected encoding.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Normalised name of the current charset; empty before any selection.
    #[must_use]
    pub fn encoding_name(&self) -> &str {
        &self.encoding_name
    }

    /// Language tag reported by autodetection, if any.
    #[must_use]
    pub fn lang_name(&self) -> &str {
        &self.lang_name
    }

    /// Active codepage translation table, when one is installed.
    #[must_use]
    pub fn charset_table(&self) -> Option<&[char; 128]> {
        self.conv_table.as_deref()
    }

    /// Repositions the cursor at absolute byte `pos`, keeping at least
    /// `prefetch` bytes (or the rest of the stream) in the window.
    ///
    /// When the requested range is already windowed only the cursor moves.
    /// Returns `false` when `pos` lies outside `[0, stream_size)`.
    pub fn seek(&mut self, pos: u64, prefetch: usize) -> bool {
        if pos >= self.buf_fpos && pos + prefetch as u64 <= self.buf_fpos + self.buf_len as u64 {
            self.buf_pos = (pos - self.buf_fpos) as usize;
            return true;
        }
        if pos >= self.stream_size {
            return false;
        }
        let mut bytes_to_read = prefetch.max(self.buf_size).max(BUF_SIZE_INCREMENT);
        bytes_to_read = bytes_to_read.min((self.stream_size - pos) as usize);
        if self.buf_size < bytes_to_read {
            self.buf_size = bytes_to_read;
            self.buf.resize(self.buf_size + BUF_GUARD_BYTES, 0);
        }
        self.buf_fpos = pos;
        self.buf_pos = 0;
        self.buf_len = 0;
        if self.stream.seek(pos).is_ok() {
            self.buf_len = read_fully(&mut *self.stream, &mut self.buf[..bytes_to_read]);
        }
        true
    }

    /// Appends up to `bytes_to_read` further stream bytes to the window,
    /// compacting or growing it as needed. Returns whether anything arrived.
    pub fn fill(&mut self, bytes_to_read: usize) -> bool {
        let filled_end = self.buf_fpos + self.buf_len as u64;
        if filled_end >= self.stream_size {
            return false;
        }
        let bytes_left = (self.stream_size - filled_end) as usize;
        let bytes_to_read = bytes_to_read.min(bytes_left);
        let mut space = self.buf_size - self.buf_len;
        if space < bytes_to_read {
            if self.buf_pos > bytes_to_read || self.buf_pos > (self.buf_len * 3) / 4 {
                // Drop the consumed head of the window.
                self.buf.copy_within(self.buf_pos..self.buf_len, 0);
                self.buf_len -= self.buf_pos;
                self.buf_fpos += self.buf_pos as u64;
                self.buf_pos = 0;
                space = self.buf_size - self.buf_len;
            }
            if space < bytes_to_read {
                self.buf_size += bytes_to_read - space + BUF_SIZE_INCREMENT;
                self.buf.resize(self.buf_size + BUF_GUARD_BYTES, 0);
            }
        }
        if self.stream.seek(filled_end).is_err() {
            return false;
        }
        let end = self.buf_len + bytes_to_read;
        let got = read_fully(&mut *self.stream, &mut self.buf[self.buf_len..end]);
        self.buf_len += got;
        got > 0
    }

    /// Rewinds to the start of the stream, clears the window and refreshes
    /// the cached stream size.
    pub fn reset(&mut self) {
        let _ = self.stream.seek(0);
        self.buf_fpos = 0;
        self.buf_pos = 0;
        self.buf_len = 0;
        self.stream_size = self.stream.size();
    }

    /// Decodes one code point under the current encoding, advancing the
    /// cursor by its encoded width. Returns `None` at end of stream.
    ///
    /// Bytes missing at the stream tail read as zero; malformed sequences
    /// yield U+FFFD rather than aborting.
    pub fn read_char(&mut self) -> Option<char> {
        if self.buf_len - self.buf_pos < 4 && self.buf_fpos + (self.buf_len as u64) < self.stream_size
        {
            self.fill(MIN_BUF_DATA_SIZE);
        }
        self.decode_one()
    }

    fn decode_one(&mut self) -> Option<char> {
        if self.buf_pos >= self.buf_len {
            return None;
        }
        let b0 = self.buf[self.buf_pos];
        self.buf_pos += 1;
        let unit = match self.encoding {
            Encoding::Codepage => {
                if b0 < 0x80 {
                    u32::from(b0)
                } else if let Some(table) = &self.conv_table {
                    return Some(table[usize::from(b0 & 0x7F)]);
                } else {
                    u32::from(b0)
                }
            }
            Encoding::Utf8 => {
                if b0 < 0x80 {
                    u32::from(b0)
                } else if b0 & 0xE0 == 0xC0 {
                    let b1 = self.next_or_zero();
                    (u32::from(b0 & 0x1F) << 6) | u32::from(b1 & 0x3F)
                } else {
                    let b1 = self.next_or_zero();
                    let b2 = self.next_or_zero();
                    (u32::from(b0 & 0x0F) << 12)
                        | (u32::from(b1 & 0x3F) << 6)
                        | u32::from(b2 & 0x3F)
                }
            }
            Encoding::Utf16Be => {
                let b1 = self.next_or_zero();
                (u32::from(b0) << 8) | u32::from(b1)
            }
            Encoding::Utf16Le => {
                let b1 = self.next_or_zero();
                (u32::from(b1) << 8) | u32::from(b0)
            }
            Encoding::Utf32Be => {
                let _ = self.next_or_zero();
                let b2 = self.next_or_zero();
                let b3 = self.next_or_zero();
                (u32::from(b2) << 8) | u32::from(b3)
            }
            Encoding::Utf32Le => {
                let b1 = self.next_or_zero();
                let _ = self.next_or_zero();
                let _ = self.next_or_zero();
                (u32::from(b1) << 8) | u32::from(b0)
            }
        };
        Some(char::from_u32(unit).unwrap_or('\u{FFFD}'))
    }

    /// Continuation byte, or zero past the window tail.
    fn next_or_zero(&mut self) -> u8 {
        if self.buf_pos < self.buf_len {
            let b = self.buf[self.buf_pos];
            self.buf_pos += 1;
            b
        } else {
            0
        }
    }

    /// Selects the charset by name.
    ///
    /// The Unicode family is matched against a fixed set (`utf-16`/`utf-32`
    /// default to little-endian); anything else is looked up as an 8-bit
    /// codepage. Unknown codepages leave the reader in untranslated
    /// single-byte mode.
    pub fn set_charset(&mut self, name: &str) {
        let normalized = name.trim().to_ascii_lowercase();
        let (encoding, table) = match normalized.as_str() {
            "utf-8" => (Encoding::Utf8, None),
            "utf-16" | "utf-16le" => (Encoding::Utf16Le, None),
            "utf-16be" => (Encoding::Utf16Be, None),
            "utf-32" | "utf-32le" => (Encoding::Utf32Le, None),
            "utf-32be" => (Encoding::Utf32Be, None),
            _ => (
                Encoding::Codepage,
                self.codepages.lookup_table(&normalized).map(Box::new),
            ),
        };
        self.encoding = encoding;
        self.conv_table = table;
        self.encoding_name = normalized;
    }

    /// Sniffs the charset from up to 64 KiB at the start of the stream and
    /// installs it. The stream position is restored afterwards.
    ///
    /// # Errors
    /// Fails when fewer than 40 bytes are available or the codepage service
    /// produced no guess; the caller decides what to fall back to.
    pub fn autodetect_encoding(&mut self) -> Result<()> {
        let old_pos = self.stream.position();
        let _ = self.stream.seek(0);
        let sz = AUTODETECT_PROBE_SIZE.min(self.stream_size as usize);
        if sz < AUTODETECT_MIN_BYTES {
            let _ = self.stream.seek(old_pos);
            return Err(IngestError::EncodingDetection(format!(
                "need at least {AUTODETECT_MIN_BYTES} bytes, stream has {sz}"
            )));
        }
        let mut probe = vec![0u8; sz];
        let got = read_fully(&mut *self.stream, &mut probe);
        let _ = self.stream.seek(old_pos);

        let detected = self.codepages.autodetect(&probe[..got]).ok_or_else(|| {
            IngestError::EncodingDetection("codepage service produced no guess".to_string())
        })?;
        debug!(
            "autodetected charset {} (language {:?})",
            detected.charset, detected.language
        );
        self.lang_name = detected.language;
        self.set_charset(&detected.charset);
        Ok(())
    }

    /// Decodes up to `max_chars` characters from at most `max_bytes` bytes
    /// starting at absolute position `pos`. Used by the format sniffers; the
    /// cursor is left wherever decoding stopped.
    pub fn read_text_at(&mut self, pos: u64, max_bytes: usize, max_chars: usize) -> String {
        if !self.seek(pos, max_bytes) {
            return String::new();
        }
        let max_pos = (self.buf_pos + max_bytes).min(self.buf_len);
        let mut out = String::new();
        let mut count = 0usize;
        while self.buf_pos < max_pos && count < max_chars {
            match self.decode_one() {
                Some(ch) => {
                    out.push(ch);
                    count += 1;
                }
                None => break,
            }
        }
        out
    }

    /// Reads one logical line of at most `max_chars` characters.
    ///
    /// A leading U+FEFF at stream position 0 is skipped. CR, LF and their
    /// complementary pairs all terminate the line. When the cap is reached
    /// the line is cut at the last whitespace seen, so no word is split
    /// while any whitespace exists; consecutive calls tile the stream
    /// exactly in bytes.
    pub fn read_line(&mut self, max_chars: usize) -> RawLine {
        let mut fpos = self.position();
        let mut text = String::with_capacity(80);
        self.fill(max_chars.saturating_mul(3));

        let mut eol = false;
        let mut soft_fpos: u64 = 0;
        let mut soft_chars: Option<usize> = None;
        let mut nchars = 0usize;
        while nchars < max_chars {
            if self.eof() {
                soft_fpos = self.position();
                soft_chars = Some(nchars);
                eol = true;
                break;
            }
            let Some(ch) = self.read_char() else {
                soft_fpos = self.position();
                soft_chars = Some(nchars);
                eol = true;
                break;
            };
            if ch == '\u{FEFF}' && fpos == 0 && text.is_empty() {
                // Byte-order mark: not part of the first line.
                fpos = self.position();
            } else if ch != '\r' && ch != '\n' {
                text.push(ch);
                nchars += 1;
                if ch == ' ' || ch == '\t' {
                    soft_fpos = self.position();
                    soft_chars = Some(nchars);
                }
            } else {
                soft_fpos = self.position();
                soft_chars = Some(nchars);
                if !self.eof() {
                    let before_peek = self.position();
                    if let Some(ch2) = self.read_char() {
                        if ch2 != ch && (ch2 == '\r' || ch2 == '\n') {
                            soft_fpos = self.position();
                        } else {
                            self.rollback_to(before_peek);
                        }
                    }
                }
                eol = true;
                break;
            }
        }

        // Length cap hit with no whitespace anywhere: cut right here.
        if !eol && soft_chars.is_none() {
            soft_fpos = self.position();
            soft_chars = Some(nchars);
        }
        let soft_chars = soft_chars.unwrap_or(nchars);

        self.rollback_to(soft_fpos);
        if soft_chars < nchars {
            if let Some((byte_idx, _)) = text.char_indices().nth(soft_chars) {
                text.truncate(byte_idx);
            }
        }
        RawLine {
            text,
            fpos,
            fsize: soft_fpos - fpos,
            eol,
        }
    }

    /// Moves the cursor back to `pos`. Within the window this is free; a
    /// compaction may have dropped the bytes, in which case the window is
    /// re-anchored.
    fn rollback_to(&mut self, pos: u64) {
        if pos >= self.buf_fpos && pos <= self.buf_fpos + self.buf_len as u64 {
            self.buf_pos = (pos - self.buf_fpos) as usize;
        } else {
            self.seek(pos, 0);
        }
    }

    // Byte-level cursor support for the XML tag scanner. Structural markup
    // is ASCII under every supported encoding, so tags are matched on raw
    // bytes while values and text go through `read_char`.

    /// Bytes currently buffered ahead of the cursor.
    pub(crate) fn buffered(&self) -> usize {
        self.buf_len - self.buf_pos
    }

    /// Next raw byte, if buffered.
    pub(crate) fn peek_byte(&self) -> Option<u8> {
        (self.buf_pos < self.buf_len).then(|| self.buf[self.buf_pos])
    }

    /// Raw byte `offset` positions ahead, if buffered.
    pub(crate) fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        let idx = self.buf_pos + offset;
        (idx < self.buf_len).then(|| self.buf[idx])
    }

    /// Advances the cursor by `n` bytes, clamped to the window.
    pub(crate) fn advance(&mut self, n: usize) {
        self.buf_pos = (self.buf_pos + n).min(self.buf_len);
    }

    /// Skips to the next occurrence of `target`, refilling as needed. The
    /// cursor stops on the byte itself; `false` means end of stream.
    pub(crate) fn skip_to_byte(&mut self, target: u8) -> bool {
        loop {
            while self.buf_pos < self.buf_len {
                if self.buf[self.buf_pos] == target {
                    return true;
                }
                self.buf_pos += 1;
            }
            if !self.fill(MIN_BUF_DATA_SIZE * 2) {
                return false;
            }
        }
    }

    /// Skips ASCII whitespace bytes, refilling as needed. `false` means the
    /// stream ended before a non-space byte.
    pub(crate) fn skip_space_bytes(&mut self) -> bool {
        loop {
            while self.buf_pos < self.buf_len {
                if !is_space_byte(self.buf[self.buf_pos]) {
                    return true;
                }
                self.buf_pos += 1;
            }
            if !self.fill(MIN_BUF_DATA_SIZE * 2) {
                return false;
            }
        }
    }
}

/// ASCII whitespace as the tag scanner understands it.
pub(crate) fn is_space_byte(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Reads until the buffer is full or the stream has nothing more; errors
/// count as end of input.
fn read_fully(stream: &mut dyn BookStream, buf: &mut [u8]) -> usize {
    let mut total = 0;
    while total < buf.len() {
        match stream.read(&mut buf[total..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => total += n,
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookflow_core::MemoryStream;

    fn reader_over(bytes: &[u8]) -> WindowedReader {
        WindowedReader::new(Box::new(MemoryStream::from(bytes)))
    }

    fn utf8_reader(text: &str) -> WindowedReader {
        let mut r = reader_over(text.as_bytes());
        r.set_charset("utf-8");
        r
    }

    #[test]
    fn test_read_char_ascii_and_eof() {
        let mut r = utf8_reader("ab");
        assert_eq!(r.read_char(), Some('a'));
        assert_eq!(r.read_char(), Some('b'));
        assert!(r.eof());
        assert_eq!(r.read_char(), None);
    }

    #[test]
    fn test_read_char_utf8_multibyte() {
        let mut r = utf8_reader("é≤"); // 2-byte then 3-byte sequence
        assert_eq!(r.read_char(), Some('é'));
        assert_eq!(r.read_char(), Some('≤'));
        assert!(r.eof());
    }

    #[test]
    fn test_read_char_utf16_both_orders() {
        let mut r = reader_over(&[0x04, 0x10, 0x00, 0x41]); // "Аa" in UTF-16 BE
        r.set_charset("utf-16be");
        assert_eq!(r.read_char(), Some('А'));
        assert_eq!(r.read_char(), Some('A'));

        let mut r = reader_over(&[0x10, 0x04, 0x41, 0x00]); // "Аa" in UTF-16 LE
        r.set_charset("utf-16le");
        assert_eq!(r.read_char(), Some('А'));
        assert_eq!(r.read_char(), Some('A'));
    }

    #[test]
    fn test_read_char_utf32_keeps_low_16_bits() {
        let mut r = reader_over(&[0x00, 0x00, 0x04, 0x10]);
        r.set_charset("utf-32be");
        assert_eq!(r.read_char(), Some('А'));

        let mut r = reader_over(&[0x10, 0x04, 0x00, 0x00]);
        r.set_charset("utf-32le");
        assert_eq!(r.read_char(), Some('А'));
    }

    #[test]
    fn test_read_char_codepage_table() {
        let mut r = reader_over(&[0xC0, 0x41, 0xFF]);
        r.set_charset("windows-1251");
        assert_eq!(r.read_char(), Some('А'));
        assert_eq!(r.read_char(), Some('A'));
        assert_eq!(r.read_char(), Some('я'));
    }

    #[test]
    fn test_read_char_unknown_codepage_is_untranslated() {
        let mut r = reader_over(&[0x41, 0x9C]);
        r.set_charset("x-weird-charset");
        assert_eq!(r.encoding(), Encoding::Codepage);
        assert!(r.charset_table().is_none());
        assert_eq!(r.read_char(), Some('A'));
        assert_eq!(r.read_char(), Some('\u{9C}')); // zero-extended byte
    }

    #[test]
    fn test_malformed_utf8_does_not_abort() {
        // A stray high byte is decoded as a 3-byte sequence, swallowing the
        // following bytes; garbage out, but no failure and no stall.
        let mut r = reader_over(&[0x80, 0x41, 0xE2]);
        r.set_charset("utf-8");
        assert!(r.read_char().is_some());
        assert!(r.eof());

        // A 2-byte lead truncated at EOF decodes with zeroed continuation.
        let mut r = reader_over(&[0x41, 0xC3]);
        r.set_charset("utf-8");
        assert_eq!(r.read_char(), Some('A'));
        assert!(r.read_char().is_some());
        assert!(r.eof());
    }

    #[test]
    fn test_cursor_monotonicity() {
        let mut r = utf8_reader("aé≤b");
        let mut last = r.position();
        while let Some(_ch) = r.read_char() {
            let now = r.position();
            assert!(now > last, "cursor must strictly advance");
            last = now;
        }
        assert_eq!(last, r.stream_size());
    }

    #[test]
    fn test_seek_within_window_only_moves_cursor() {
        let mut r = utf8_reader("0123456789");
        assert!(r.seek(0, 10));
        assert_eq!(r.read_char(), Some('0'));
        assert!(r.seek(7, 2));
        assert_eq!(r.read_char(), Some('7'));
        assert!(r.seek(1, 0));
        assert_eq!(r.read_char(), Some('1'));
    }

    #[test]
    fn test_seek_out_of_range_fails() {
        let mut r = utf8_reader("abc");
        assert!(!r.seek(3, 0));
        assert!(!r.seek(100, 0));
        assert!(r.seek(2, 1));
        assert_eq!(r.read_char(), Some('c'));
    }

    #[test]
    fn test_seek_idempotence() {
        let text = "The quick brown fox";
        let mut fresh = utf8_reader(text);
        assert!(fresh.seek(4, 4));
        let expected = fresh.read_char();

        let mut r = utf8_reader(text);
        for _ in 0..10 {
            r.read_char();
        }
        assert!(r.seek(4, 4));
        assert_eq!(r.read_char(), expected);
    }

    #[test]
    fn test_set_charset_defaults_to_little_endian() {
        let mut r = reader_over(b"xx");
        r.set_charset("utf-16");
        assert_eq!(r.encoding(), Encoding::Utf16Le);
        r.set_charset("utf-32");
        assert_eq!(r.encoding(), Encoding::Utf32Le);
        r.set_charset("UTF-8");
        assert_eq!(r.encoding(), Encoding::Utf8);
        assert_eq!(r.encoding_name(), "utf-8");
    }

    #[test]
    fn test_set_charset_clears_previous_table() {
        let mut r = reader_over(b"x");
        r.set_charset("windows-1251");
        assert!(r.charset_table().is_some());
        r.set_charset("utf-8");
        assert!(r.charset_table().is_none());
    }

    #[test]
    fn test_autodetect_requires_forty_bytes() {
        let mut r = reader_over(b"too short");
        let err = r.autodetect_encoding().unwrap_err();
        assert!(matches!(err, IngestError::EncodingDetection(_)));
    }

    #[test]
    fn test_autodetect_restores_position() {
        let data = "A".repeat(100);
        let mut r = reader_over(data.as_bytes());
        r.set_charset("utf-8");
        assert!(r.seek(0, 16));
        for _ in 0..5 {
            r.read_char();
        }
        r.autodetect_encoding().unwrap();
        assert_eq!(r.encoding(), Encoding::Utf8);
        // The window was untouched; the cursor still sits where it was.
        assert_eq!(r.position(), 5);
    }

    #[test]
    fn test_fill_grows_and_compacts() {
        let data: Vec<u8> = (0..20000u32).map(|i| (i % 251) as u8).collect();
        let mut r = WindowedReader::new(Box::new(MemoryStream::new(data.clone())));
        r.set_charset("iso-8859-1");
        assert!(r.seek(0, 64));
        // Walk the whole stream; refills force compaction and growth.
        let mut count = 0u64;
        while r.read_char().is_some() {
            count += 1;
        }
        assert_eq!(count, 20000);
    }

    #[test]
    fn test_read_line_basic_lf() {
        let mut r = utf8_reader("Hello\nWorld\n");
        let l1 = r.read_line(1000);
        assert_eq!(l1.text, "Hello");
        assert_eq!(l1.fpos, 0);
        assert_eq!(l1.fsize, 6);
        assert!(l1.eol);
        let l2 = r.read_line(1000);
        assert_eq!(l2.text, "World");
        assert_eq!(l2.fpos, 6);
        assert_eq!(l2.fsize, 6);
    }

    #[test]
    fn test_read_line_crlf_and_lfcr_pairs() {
        let mut r = utf8_reader("a\r\nb\n\rc\rd");
        assert_eq!(r.read_line(100).text, "a");
        assert_eq!(r.read_line(100).text, "b");
        assert_eq!(r.read_line(100).text, "c");
        let last = r.read_line(100);
        assert_eq!(last.text, "d");
        assert!(last.eol); // end of stream counts as a line end
    }

    #[test]
    fn test_read_line_tiling() {
        let mut r = utf8_reader("one two three\nfour\n\nfive\r\nsix");
        let mut pos = 0u64;
        while !r.eof() {
            let line = r.read_line(100);
            assert_eq!(line.fpos, pos, "lines must tile the stream");
            pos = line.fpos + line.fsize;
        }
        assert_eq!(pos, r.stream_size());
    }

    #[test]
    fn test_read_line_soft_break_at_whitespace() {
        let mut r = utf8_reader("alpha beta gamma");
        let line = r.read_line(12);
        // The cap lands inside "gamma"; the break rolls back to the space.
        assert_eq!(line.text, "alpha beta ");
        assert!(!line.eol);
        let rest = r.read_line(100);
        assert_eq!(rest.text, "gamma");
        assert_eq!(rest.fpos, 11);
    }

    #[test]
    fn test_read_line_cap_without_whitespace_cuts_hard() {
        let mut r = utf8_reader("abcdefghij");
        let line = r.read_line(4);
        assert_eq!(line.text, "abcd");
        assert!(!line.eol);
        assert_eq!(r.read_line(100).text, "efghij");
    }

    #[test]
    fn test_read_line_skips_bom() {
        let mut r = utf8_reader("\u{FEFF}Hello\nWorld");
        let l1 = r.read_line(100);
        assert_eq!(l1.text, "Hello");
        assert_eq!(l1.fpos, 3); // the BOM's bytes are not part of the line
        assert_eq!(r.read_line(100).text, "World");
    }

    #[test]
    fn test_read_text_at_decodes_bounded_run() {
        let mut r = utf8_reader("0123456789");
        assert_eq!(r.read_text_at(2, 5, 100), "23456");
        assert_eq!(r.read_text_at(0, 100, 3), "012");
    }

    #[test]
    fn test_reset_rewinds_everything() {
        let mut r = utf8_reader("abc");
        r.read_char();
        r.read_char();
        r.reset();
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_char(), Some('a'));
    }
}
