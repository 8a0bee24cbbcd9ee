//! Plain-text book import.
//!
//! [`TextImporter`] reads an unstructured text file through the windowed
//! reader, measures a sliding window of line statistics to pick a paragraph
//! delimitation strategy, promotes likely headings, extracts author/title
//! metadata from the first lines, and emits a FictionBook-shaped event
//! stream:
//!
//! `?xml` · `FictionBook` · `description` · `title-info` (authors, title,
//! optional sequence) · `body` · `section` · paragraphs.

use std::collections::VecDeque;

use bitflags::bitflags;
use log::debug;

use bookflow_core::{BookStream, CodepageProvider, DocumentSink, TextFlags};

use crate::entities::trim_text;
use crate::error::Result;
use crate::heading::heading_level;
use crate::reader::{RawLine, WindowedReader};

/// Longest paragraph, in lines, the grouping strategies will build.
const MAX_PARA_LINES: usize = 30;
/// How many lines are read per pass and retained at most.
const MAX_BUF_LINES: usize = 200;
/// Character cap per line; longer lines soft-break at whitespace.
const DEFAULT_MAX_LINE_CHARS: usize = 1000;
/// How much decoded text the format sniffer inspects.
const TEXT_PROBE_SIZE: usize = 16384;

bitflags! {
    /// Detected layout of a plain-text file, driving paragraph and heading
    /// delimitation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FormatFlags: u32 {
        /// Every non-empty line is its own paragraph.
        const PARA_PER_LINE = 1;
        /// Paragraph starts are detected by left indent beyond the minimum.
        const PARA_INDENTS = 1 << 1;
        /// Empty lines separate paragraphs.
        const EMPTY_LINE_DELIM_PARA = 1 << 2;
        /// Headings are horizontally centered. Reserved: defined but never
        /// set by detection.
        const CENTERED_HEADERS = 1 << 3;
        /// Empty lines separate headings; part of the default layout.
        const EMPTY_LINE_DELIM_HEADERS = 1 << 4;
    }
}

impl FormatFlags {
    /// Layout assumed when detection has too little to go on.
    #[must_use]
    pub const fn default_layout() -> Self {
        Self::PARA_PER_LINE.union(Self::EMPTY_LINE_DELIM_HEADERS)
    }
}

/// One buffered line with its layout measurements.
///
/// `lpos` is the column of the first non-space character and `rpos` one past
/// the last, both under 8-column tab expansion. An empty (or all-space) line
/// has `lpos == rpos`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineRecord {
    /// Absolute byte offset of the line start.
    pub fpos: u64,
    /// Encoded byte length including the terminator.
    pub fsize: u64,
    /// True when the line ended at an end-of-line rather than the cap.
    pub eol: bool,
    /// Decoded text without the terminator.
    pub text: String,
    /// First non-space column.
    pub lpos: u32,
    /// One past the last non-space column.
    pub rpos: u32,
}

impl LineRecord {
    fn from_raw(raw: RawLine) -> Self {
        let mut lpos = 0u32;
        let mut rpos = 0u32;
        let mut col = 0u32;
        for ch in raw.text.chars() {
            if ch == '\t' {
                col = (col + 8) & !7;
            } else {
                if ch != ' ' {
                    if rpos == 0 {
                        lpos = col;
                    }
                    rpos = col + 1;
                }
                col += 1;
            }
        }
        Self {
            fpos: raw.fpos,
            fsize: raw.fsize,
            eol: raw.eol,
            text: raw.text,
            lpos,
            rpos,
        }
    }

    /// True for lines with no visible characters.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lpos == self.rpos
    }
}

/// Plain-text structural importer.
pub struct TextImporter {
    reader: WindowedReader,
    lines: VecDeque<LineRecord>,
    first_line_index: usize,
    max_line_chars: usize,
    format: FormatFlags,
    min_left: i32,
    max_right: i32,
    avg_left: i32,
    avg_right: i32,
    para_count: usize,
    series_name: Option<String>,
    series_number: Option<String>,
    charset_pinned: bool,
}

impl TextImporter {
    /// Creates an importer over `stream` with the builtin codepage tables.
    #[must_use]
    pub fn new(stream: Box<dyn BookStream>) -> Self {
        Self::from_reader(WindowedReader::new(stream))
    }

    /// Creates an importer with a caller-supplied codepage service.
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
            lines: VecDeque::new(),
            first_line_index: 0,
            max_line_chars: DEFAULT_MAX_LINE_CHARS,
            format: FormatFlags::default_layout(),
            min_left: -1,
            max_right: -1,
            avg_left: 0,
            avg_right: 0,
            para_count: 0,
            series_name: None,
            series_number: None,
            charset_pinned: false,
        }
    }

    /// Pins the input charset, disabling autodetection.
    pub fn set_charset(&mut self, name: &str) {
        self.reader.set_charset(name);
        self.charset_pinned = true;
    }

    /// Sets series metadata to be emitted as a `sequence` element. There is
    /// no detection path for this; it comes from the caller.
    pub fn set_series(&mut self, name: Option<String>, number: Option<String>) {
        self.series_name = name;
        self.series_number = number;
    }

    /// Layout flags chosen by the last format detection.
    #[must_use]
    pub const fn format_flags(&self) -> FormatFlags {
        self.format
    }

    /// Logical index of the queue head: how many lines have been read and
    /// dropped so far.
    #[must_use]
    pub const fn first_line_index(&self) -> usize {
        self.first_line_index
    }

    /// Rewinds the importer for a fresh parse.
    pub fn reset(&mut self) {
        self.reader.reset();
        self.lines.clear();
        self.first_line_index = 0;
        self.para_count = 0;
        self.format = FormatFlags::default_layout();
    }

    /// Sniffs whether the stream looks like plain text: decodable, free of
    /// control garbage, with a credible share of spaces.
    pub fn check_format(&mut self) -> bool {
        self.reader.reset();
        if self.reader.autodetect_encoding().is_err() {
            self.reader.reset();
            return false;
        }
        self.reader.reset();
        let probe = self
            .reader
            .read_text_at(0, TEXT_PROBE_SIZE, TEXT_PROBE_SIZE);
        let mut ok = false;
        let total = probe.chars().count();
        if total > 100 {
            let mut illegal = 0usize;
            let mut spaces = 0usize;
            for ch in probe.chars() {
                if u32::from(ch) <= 32 {
                    match ch {
                        ' ' | '\t' => spaces += 1,
                        '\n' | '\r' => {}
                        // Stray but harmless controls seen in old text files.
                        '\x07' | '\x08' | '\x0C' | '\x1E' => {}
                        _ => illegal += 1,
                    }
                }
            }
            ok = illegal == 0 && spaces >= total / 16;
        }
        self.reader.reset();
        ok
    }

    /// Runs the import, emitting the whole document into `sink`.
    ///
    /// # Errors
    /// Currently infallible in practice: charset autodetection failures fall
    /// back to UTF-8, and all downstream conditions degrade instead of
    /// failing. The `Result` is the contract of the parser seam.
    pub fn parse(&mut self, sink: &mut dyn DocumentSink) -> Result<()> {
        self.reset();
        if !self.charset_pinned {
            if let Err(err) = self.reader.autodetect_encoding() {
                debug!("charset autodetection unavailable ({err}); assuming utf-8");
                self.reader.set_charset("utf-8");
            }
        }
        self.read_lines(MAX_BUF_LINES);
        self.detect_format();

        sink.on_start();
        sink.on_tag_open(None, "?xml");
        sink.on_attribute(None, "version", "1.0");
        sink.on_tag_close(None, "?xml");
        sink.on_tag_open(None, "FictionBook");
        sink.on_tag_open(None, "description");
        sink.on_tag_open(None, "title-info");
        self.emit_book_description(sink);
        sink.on_tag_close(None, "title-info");
        sink.on_tag_close(None, "description");
        sink.on_tag_open(None, "body");
        sink.on_tag_open(None, "section");
        if self.format.contains(FormatFlags::PARA_INDENTS) {
            self.import_indent_delimited(sink);
        } else if self.format.contains(FormatFlags::EMPTY_LINE_DELIM_PARA) {
            self.import_empty_line_delimited(sink);
        } else {
            self.import_para_per_line(sink);
        }
        sink.on_tag_close(None, "section");
        sink.on_tag_close(None, "body");
        sink.on_tag_close(None, "FictionBook");
        sink.on_stop();
        Ok(())
    }

    /// Appends up to `count` lines to the queue; `false` when the stream had
    /// nothing more to give.
    fn read_lines(&mut self, count: usize) -> bool {
        let mut added = 0usize;
        for _ in 0..count {
            if self.reader.eof() {
                break;
            }
            let raw = self.reader.read_line(self.max_line_chars);
            self.lines.push_back(LineRecord::from_raw(raw));
            added += 1;
        }
        added > 0
    }

    /// Drops `count` lines from the head of the queue.
    fn remove_lines(&mut self, count: usize) {
        let count = count.min(self.lines.len());
        self.lines.drain(..count);
        self.first_line_index += count;
    }

    /// Measures the buffered window and picks the layout flags.
    ///
    /// Deliberately pure over the window: running it twice yields identical
    /// flags and statistics.
    fn detect_format(&mut self) {
        self.format = FormatFlags::default_layout();
        self.min_left = -1;
        self.max_right = -1;
        self.avg_left = 0;
        self.avg_right = 0;
        if self.lines.len() < 10 {
            return;
        }

        let mut empty_lines = 0usize;
        let mut min_left = -1i64;
        let mut max_right = -1i64;
        let mut sum_left = 0i64;
        let mut sum_right = 0i64;
        for line in &self.lines {
            if line.is_empty() {
                empty_lines += 1;
                continue;
            }
            let (l, r) = (i64::from(line.lpos), i64::from(line.rpos));
            if min_left < 0 || l < min_left {
                min_left = l;
            }
            if r > max_right {
                max_right = r;
            }
            sum_left += l;
            sum_right += r;
        }
        let total = self.lines.len();
        let non_empty = total - empty_lines;
        if non_empty < 10 {
            return;
        }
        let ident_lines = self
            .lines
            .iter()
            .filter(|l| !l.is_empty() && i64::from(l.lpos) > min_left)
            .count();
        self.min_left = min_left as i32;
        self.max_right = max_right as i32;
        self.avg_left = (sum_left / non_empty as i64) as i32;
        self.avg_right = (sum_right / non_empty as i64) as i32;
        debug!(
            "format stats: {total} lines, {empty_lines} empty, {ident_lines} indented, \
             left {}..{} avg {}/{}",
            self.min_left, self.max_right, self.avg_left, self.avg_right
        );

        // Unusually wide wrapped text parses better line-per-line.
        if self.avg_right >= 80 {
            return;
        }
        let mut flags = FormatFlags::empty();
        if empty_lines * 100 / total > 5 {
            flags |= FormatFlags::EMPTY_LINE_DELIM_PARA;
        }
        if ident_lines * 100 / non_empty > 5 {
            flags |= FormatFlags::PARA_INDENTS;
        }
        if !flags.is_empty() {
            self.format = flags;
        }
    }

    /// Emits author, title and series metadata from the first two non-empty
    /// lines: line 0 is a comma-separated author list, line 1 the title.
    fn emit_book_description(&mut self, sink: &mut dyn DocumentSink) {
        let desc_flags = TextFlags::TRIM | TextFlags::TRIM_REMOVE_EOL_HYPHENS;
        let mut found: Vec<String> = Vec::new();
        for line in &self.lines {
            if found.len() >= 2 {
                break;
            }
            if line.is_empty() {
                continue;
            }
            let trimmed = trim_text(&line.text, desc_flags);
            if !trimmed.is_empty() {
                found.push(trimmed);
            }
        }

        let title = if found.is_empty() {
            "no name".to_string()
        } else {
            found.get(1).cloned().unwrap_or_default()
        };

        if let Some(author_line) = found.first() {
            for entry in author_line.split(',') {
                let names: Vec<&str> = entry.split_whitespace().collect();
                if names.is_empty() {
                    continue;
                }
                let (first, middle, last) = match names.len() {
                    1 => (names[0], "", ""),
                    2 => (names[0], "", names[1]),
                    _ => (names[0], names[1], names[2]),
                };
                sink.on_tag_open(None, "author");
                emit_name(sink, "first-name", first);
                emit_name(sink, "middle-name", middle);
                emit_name(sink, "last-name", last);
                sink.on_tag_close(None, "author");
            }
        }

        sink.on_tag_open(None, "book-title");
        if !title.is_empty() {
            sink.on_text(&title, 0, 0, TextFlags::empty());
        }
        sink.on_tag_close(None, "book-title");

        if self.series_name.is_some() || self.series_number.is_some() {
            sink.on_tag_open(None, "sequence");
            if let Some(name) = &self.series_name {
                sink.on_attribute(None, "name", name);
            }
            if let Some(number) = &self.series_number {
                sink.on_attribute(None, "number", number);
            }
            sink.on_tag_close(None, "sequence");
        }
    }

    /// Joins lines `start..=end` into one paragraph and emits it, classified
    /// as heading or body text. Empty paragraphs become `empty-line` except
    /// in empty-line-delimited mode, where blank lines are delimiters.
    fn add_para(&mut self, start: usize, end: usize, sink: &mut dyn DocumentSink) {
        let mut pos = 0u64;
        let mut size = 0u64;
        let mut text = String::new();
        for i in start..=end {
            let line = &self.lines[i];
            if i == start {
                pos = line.fpos;
            }
            size = (line.fpos + line.fsize) - pos;
            if i > start {
                text.push('\n');
            }
            text.push_str(&line.text);
        }

        let flags = TextFlags::TRIM | TextFlags::TRIM_REMOVE_EOL_HYPHENS;
        let para = trim_text(&text, flags);
        if para.is_empty() {
            if !self.format.contains(FormatFlags::EMPTY_LINE_DELIM_PARA) {
                sink.on_tag_open(None, "empty-line");
                sink.on_tag_close(None, "empty-line");
            }
            return;
        }

        let chars = para.chars().count();
        let is_heading =
            chars < 4 || (self.para_count < 2 && chars < 50) || heading_level(&para) > 0;
        if is_heading {
            sink.on_tag_open(None, "title");
        }
        sink.on_tag_open(None, "p");
        sink.on_text(&para, pos, size, flags);
        sink.on_tag_close(None, "p");
        if is_heading {
            sink.on_tag_close(None, "title");
        }
        self.para_count += 1;
    }

    fn import_para_per_line(&mut self, sink: &mut dyn DocumentSink) {
        loop {
            for i in 0..self.lines.len() {
                self.add_para(i, i, sink);
            }
            let drained = self.lines.len();
            self.remove_lines(drained);
            if !self.read_lines(100) {
                break;
            }
        }
    }

    fn import_indent_delimited(&mut self, sink: &mut dyn DocumentSink) {
        let mut pos = 0usize;
        loop {
            if self.lines.len().saturating_sub(pos) <= MAX_PARA_LINES {
                if pos > 0 {
                    self.remove_lines(pos);
                }
                self.read_lines(MAX_BUF_LINES);
                pos = 0;
            }
            if pos >= self.lines.len() {
                break;
            }
            let mut i = pos + 1;
            if heading_level(&self.lines[pos].text) == 0 {
                while i < self.lines.len() && i < pos + MAX_PARA_LINES {
                    if i64::from(self.lines[i].lpos) > i64::from(self.min_left) {
                        break;
                    }
                    i += 1;
                }
            }
            self.add_para(pos, i - 1, sink);
            pos = i;
        }
    }

    fn import_empty_line_delimited(&mut self, sink: &mut dyn DocumentSink) {
        let mut pos = 0usize;
        loop {
            if self.lines.len().saturating_sub(pos) <= MAX_PARA_LINES {
                if pos > 0 {
                    self.remove_lines(pos);
                }
                self.read_lines(MAX_BUF_LINES);
                pos = 0;
            }
            if pos >= self.lines.len() {
                break;
            }
            let mut i = pos;
            if heading_level(&self.lines[pos].text) == 0 {
                while i < self.lines.len() && i < pos + MAX_PARA_LINES {
                    if self.lines[i].is_empty() {
                        break;
                    }
                    i += 1;
                }
            }
            let end = i.min(self.lines.len() - 1);
            self.add_para(pos, end, sink);
            pos = i + 1;
        }
    }
}

fn emit_name(sink: &mut dyn DocumentSink, tag: &str, value: &str) {
    sink.on_tag_open(None, tag);
    if !value.is_empty() {
        sink.on_text(
            value,
            0,
            0,
            TextFlags::TRIM | TextFlags::TRIM_REMOVE_EOL_HYPHENS,
        );
    }
    sink.on_tag_close(None, tag);
}
