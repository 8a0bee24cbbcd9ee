//! FictionBook-dialect XML pull parser.
//!
//! A four-state machine over the windowed reader. Structural markup is
//! scanned on raw bytes (tags are ASCII under every supported encoding);
//! attribute values and text content are decoded through the character
//! cursor, so multi-byte encodings hold inside them.
//!
//! The parser never fails on bad markup: a broken tag is skipped to the next
//! `>`, a broken attribute to the next `<`, and the event stream simply
//! resynchronises.

use log::{debug, warn};

use bookflow_core::{BookStream, CodepageProvider, DocumentSink, TextFlags};

use crate::entities::pre_process;
use crate::error::Result;
use crate::reader::{is_space_byte, WindowedReader, MIN_BUF_DATA_SIZE};

/// Longest text chunk emitted in one `on_text` call, in characters.
const TEXT_SPLIT_SIZE: usize = 8192;
/// How much decoded text the format sniffer inspects.
const XML_PROBE_SIZE: usize = 8192;

/// Parser position in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    /// Before the first `<`.
    #[default]
    BeforeFirstTag,
    /// Just past a `<`, expecting a tag name.
    AfterLt,
    /// Inside a tag, reading attributes until `>`.
    InAttrs,
    /// Between tags, accumulating text.
    InText,
}

/// Streaming XML parser emitting into a [`DocumentSink`].
pub struct XmlParser {
    reader: WindowedReader,
    state: State,
    trim_spaces: bool,
    text_buf: Vec<char>,
}

impl XmlParser {
    /// Creates a parser over `stream` with the builtin codepage tables.
    #[must_use]
    pub fn new(stream: Box<dyn BookStream>) -> Self {
        Self::from_reader(WindowedReader::new(stream))
    }

    /// Creates a parser with a caller-supplied codepage service.
    #[must_use]
    pub fn with_codepages(
        stream: Box<dyn BookStream>,
        codepages: Box<dyn CodepageProvider>,
    ) -> Self {
        Self::from_reader(WindowedReader::with_codepages(stream, codepages))
    }

    fn from_reader(reader: WindowedReader) -> Self {
        Self {
            reader,
            state: State::BeforeFirstTag,
            trim_spaces: true,
            text_buf: Vec::new(),
        }
    }

    /// Selects the input charset up front (an XML declaration can still
    /// switch it mid-stream).
    pub fn set_charset(&mut self, name: &str) {
        self.reader.set_charset(name);
    }

    /// Whitespace mode for text content: `true` (default) normalises, and
    /// `false` preserves whitespace verbatim, marking chunks `PRE`.
    pub fn set_space_mode(&mut self, trim_spaces: bool) {
        self.trim_spaces = trim_spaces;
    }

    /// Rewinds the parser for a fresh parse.
    pub fn reset(&mut self) {
        self.reader.reset();
        self.state = State::BeforeFirstTag;
    }

    /// Sniffs whether the stream looks like a FictionBook document.
    pub fn check_format(&mut self) -> bool {
        self.reset();
        let probe = self.reader.read_text_at(0, XML_PROBE_SIZE, XML_PROBE_SIZE);
        let ok = probe.chars().count() > 100
            && probe.contains("<?xml")
            && probe.contains("<FictionBook");
        self.reset();
        ok
    }

    /// Runs the parse to end of stream, emitting into `sink`.
    ///
    /// # Errors
    /// Infallible in practice: markup errors degrade into skips and a
    /// truncated stream just ends the session. The `Result` is the contract
    /// of the parser seam.
    #[allow(clippy::too_many_lines)] // the state machine reads best in one piece
    pub fn parse(&mut self, sink: &mut dyn DocumentSink) -> Result<()> {
        self.reset();
        sink.on_start();

        let mut in_xml_decl = false;
        let mut tag_ns = String::new();
        let mut tag_name = String::new();
        let mut attr_ns = String::new();
        let mut attr_name = String::new();
        let mut attr_value = String::new();

        while !self.reader.eof() {
            if self.reader.buffered() < MIN_BUF_DATA_SIZE {
                self.reader.fill(MIN_BUF_DATA_SIZE * 2);
            }
            if self.reader.buffered() == 0 {
                break;
            }
            match self.state {
                State::BeforeFirstTag => {
                    if self.reader.skip_to_byte(b'<') {
                        self.reader.advance(1);
                        self.state = State::AfterLt;
                    }
                }
                State::AfterLt => {
                    if !self.reader.skip_space_bytes() {
                        break;
                    }
                    let mut close_flag = false;
                    let mut pi_flag = false;
                    match self.reader.peek_byte() {
                        Some(b'/') => {
                            self.reader.advance(1);
                            close_flag = true;
                        }
                        Some(b'?') => {
                            self.reader.advance(1);
                            pi_flag = true;
                        }
                        Some(b'!') => {
                            // Comments and DOCTYPE: recognised, not modelled.
                        }
                        _ => {}
                    }
                    let ident_ok = self.read_ident(&mut tag_ns, &mut tag_name);
                    let stray_eq = ident_ok && {
                        self.reader.skip_space_bytes();
                        self.reader.peek_byte() == Some(b'=')
                    };
                    if !ident_ok || stray_eq {
                        debug!("malformed tag, skipping to '>'");
                        if self.reader.skip_to_byte(b'>') {
                            self.state = State::InText;
                            self.reader.advance(1);
                        }
                        continue;
                    }
                    if close_flag {
                        sink.on_tag_close(ns_opt(&tag_ns), &tag_name);
                        if self.reader.skip_to_byte(b'>') {
                            self.state = State::InText;
                            self.reader.advance(1);
                        }
                        continue;
                    }
                    if pi_flag {
                        tag_name.insert(0, '?');
                    }
                    sink.on_tag_open(ns_opt(&tag_ns), &tag_name);
                    in_xml_decl = tag_name == "?xml";
                    self.state = State::InAttrs;
                }
                State::InAttrs => {
                    if !self.reader.skip_space_bytes() {
                        break;
                    }
                    let ch = self.reader.peek_byte().unwrap_or(0);
                    let next = self.reader.peek_byte_at(1).unwrap_or(0);
                    if ch == b'>' || (next == b'>' && (ch == b'/' || ch == b'?')) {
                        if ch != b'>' {
                            sink.on_tag_close(ns_opt(&tag_ns), &tag_name);
                        }
                        self.reader.advance(if ch == b'>' { 1 } else { 2 });
                        self.state = State::InText;
                        continue;
                    }
                    if !self.read_ident(&mut attr_ns, &mut attr_name) {
                        warn!("malformed attribute in <{tag_name}>, skipping to next tag");
                        if self.reader.skip_to_byte(b'<') {
                            self.reader.advance(1);
                        }
                        self.state = State::AfterLt;
                        continue;
                    }
                    self.reader.skip_space_bytes();
                    attr_value.clear();
                    if self.reader.peek_byte() == Some(b'=') {
                        self.reader.advance(1);
                        self.reader.skip_space_bytes();
                        self.read_attr_value(&mut attr_value);
                    }
                    sink.on_attribute(ns_opt(&attr_ns), &attr_name, &attr_value);
                    if in_xml_decl && attr_name == "encoding" {
                        // The declaration is ASCII under every supported
                        // encoding, so switching here is safe: everything
                        // after the `?>` decodes under the new charset.
                        self.reader.set_charset(&attr_value);
                        sink.on_encoding(self.reader.encoding_name(), self.reader.charset_table());
                    }
                }
                State::InText => {
                    self.read_text(sink);
                    self.state = State::AfterLt;
                }
            }
        }
        sink.on_stop();
        Ok(())
    }

    /// Reads `name` or `ns:name` starting at the cursor. On success the
    /// cursor rests on the terminator (whitespace, `/`, `>`, `?` or `=`).
    fn read_ident(&mut self, ns: &mut String, name: &mut String) -> bool {
        ns.clear();
        name.clear();
        match self.reader.peek_byte() {
            Some(b) if b.is_ascii_alphabetic() => {
                name.push(char::from(b));
                self.reader.advance(1);
            }
            _ => return false,
        }
        loop {
            match self.reader.peek_byte() {
                None => {
                    if !self.reader.fill(MIN_BUF_DATA_SIZE) {
                        return true; // ident runs into end of stream
                    }
                }
                Some(b) if is_ident_byte(b) => {
                    if b == b':' {
                        if !ns.is_empty() {
                            return false; // second colon terminates the ident
                        }
                        std::mem::swap(ns, name);
                    } else {
                        name.push(char::from(b));
                    }
                    self.reader.advance(1);
                }
                Some(b) => {
                    return !name.is_empty()
                        && (is_space_byte(b) || matches!(b, b'/' | b'>' | b'?' | b'='));
                }
            }
        }
    }

    /// Reads an attribute value at the cursor: quoted up to the matching
    /// quote, unquoted up to whitespace or `>`. Values decode through the
    /// character cursor; entity references are left as-is.
    fn read_attr_value(&mut self, value: &mut String) {
        let quote = match self.reader.peek_byte() {
            Some(q @ (b'"' | b'\'')) => {
                self.reader.advance(1);
                Some(q)
            }
            _ => None,
        };
        while !self.reader.eof() {
            if self.reader.buffered() < MIN_BUF_DATA_SIZE {
                self.reader.fill(MIN_BUF_DATA_SIZE * 2);
            }
            match quote {
                Some(q) => {
                    if self.reader.peek_byte() == Some(q) {
                        self.reader.advance(1);
                        break;
                    }
                }
                None => {
                    let b = self.reader.peek_byte().unwrap_or(b'>');
                    if b == b'>' || is_space_byte(b) {
                        break;
                    }
                }
            }
            match self.reader.read_char() {
                Some(ch) if ch != '\0' => value.push(ch),
                _ => break,
            }
        }
    }

    /// Reads text content up to the next `<` (consumed) or end of stream,
    /// emitting chunks of at most [`TEXT_SPLIT_SIZE`] characters. Chunks
    /// split at whitespace when any was seen, and every chunk carries the
    /// byte range it decodes, so ranges tile the text node exactly.
    fn read_text(&mut self, sink: &mut dyn DocumentSink) {
        let mut text_start = self.reader.position();
        let mut last_split_fpos: u64 = 0;
        let mut last_split_len = 0usize;
        self.text_buf.clear();
        let flags = if self.trim_spaces {
            TextFlags::empty()
        } else {
            TextFlags::PRE
        };

        loop {
            if self.reader.buffered() < MIN_BUF_DATA_SIZE {
                self.reader.fill(MIN_BUF_DATA_SIZE * 2);
            }
            let ch_start = self.reader.position();
            let Some(ch) = self.reader.read_char() else {
                // End of stream: flush what accumulated.
                last_split_fpos = self.reader.position();
                last_split_len = self.text_buf.len();
                self.flush_text(sink, text_start, last_split_fpos, last_split_len, flags);
                return;
            };
            let at_break = ch == '<' || self.reader.eof();
            if ch != '<' {
                self.text_buf.push(ch);
            }
            if self.text_buf.len() > TEXT_SPLIT_SIZE || at_break {
                if last_split_fpos == 0 || at_break {
                    last_split_fpos = if ch == '<' {
                        ch_start
                    } else {
                        self.reader.position()
                    };
                    last_split_len = self.text_buf.len();
                }
                self.flush_text(sink, text_start, last_split_fpos, last_split_len, flags);
                if at_break {
                    return;
                }
                self.text_buf.drain(..last_split_len);
                text_start = last_split_fpos;
                last_split_fpos = 0;
                last_split_len = 0;
            } else if ch == ' '
                || (ch == '\r' && self.reader.peek_byte() != Some(b'\n'))
                || (ch == '\n' && self.reader.peek_byte() != Some(b'\r'))
            {
                last_split_fpos = self.reader.position();
                last_split_len = self.text_buf.len();
            }
        }
    }

    /// Pre-processes `text_buf[..len]` and emits it with its byte range.
    fn flush_text(
        &mut self,
        sink: &mut dyn DocumentSink,
        fpos: u64,
        split_fpos: u64,
        len: usize,
        flags: TextFlags,
    ) {
        let mut chunk: Vec<char> = self.text_buf[..len].to_vec();
        pre_process(&mut chunk, flags);
        if chunk.is_empty() {
            return;
        }
        let text: String = chunk.into_iter().collect();
        sink.on_text(&text, fpos, split_fpos - fpos, flags);
    }
}

fn ns_opt(ns: &str) -> Option<&str> {
    if ns.is_empty() {
        None
    } else {
        Some(ns)
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':')
}
