//! # bookflow-ingest
//!
//! Streaming e-book ingestion: byte streams in unknown encodings go in, a
//! structured document event stream comes out.
//!
//! Two importers share one substrate. The plain-text importer infers book
//! structure (title, author, paragraphs, headings) from unstructured text;
//! the XML importer parses FictionBook-style documents. Both decode through
//! the same windowed reader and drive the same [`DocumentSink`] event
//! contract from `bookflow-core`.
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | [`reader`] | Sliding byte window with on-the-fly decoding (codepages, UTF-8/16/32) and the line reader |
//! | [`text`] | Plain-text structural importer: line statistics, layout detection, paragraph/heading emission |
//! | [`xml`] | XML pull parser: tag/attribute state machine, text chunking, mid-stream encoding switch |
//! | [`entities`] | Text normalisation: line ends, space runs, numeric character references, trim policy |
//! | [`heading`] | Heading-level classifier for plain-text lines |
//!
//! ## Quick start
//!
//! ### Import a plain-text book
//!
//! ```rust
//! use bookflow_core::{MemoryStream, TreeBuilder};
//! use bookflow_ingest::TextImporter;
//!
//! let source = "Jules Verne\nThe Mysterious Island\n\nChapter 1\n\nThe storm raged on.\n";
//! let mut importer = TextImporter::new(Box::new(MemoryStream::from(source)));
//! let mut sink = TreeBuilder::new();
//! importer.parse(&mut sink)?;
//!
//! let doc = sink.into_document();
//! assert_eq!(doc.root().unwrap().name, "FictionBook");
//! # Ok::<(), bookflow_ingest::IngestError>(())
//! ```
//!
//! ### Parse a FictionBook document
//!
//! ```rust
//! use bookflow_core::{MemoryStream, TreeBuilder};
//! use bookflow_ingest::XmlParser;
//!
//! let xml = r#"<?xml version="1.0" encoding="utf-8"?>
//! <FictionBook><body><p>hi &#38; bye</p></body></FictionBook>"#;
//! let mut parser = XmlParser::new(Box::new(MemoryStream::from(xml)));
//! let mut sink = TreeBuilder::new();
//! parser.parse(&mut sink)?;
//!
//! let doc = sink.into_document();
//! let body = doc.root().unwrap().child("body").unwrap();
//! assert_eq!(body.child("p").unwrap().text(), "hi & bye");
//! # Ok::<(), bookflow_ingest::IngestError>(())
//! ```
//!
//! ## Tolerance
//!
//! Neither importer raises on malformed input: bad markup is skipped to a
//! resynchronisation point, undecodable bytes become replacement garbage,
//! and truncated streams end the session cleanly. See the
//! [`error`] module for the few conditions that do surface as errors.

/// Text normalisation passes shared by both importers.
pub mod entities;
/// Error types for stream ingestion.
pub mod error;
/// Heading detection for plain-text import.
pub mod heading;
/// Windowed decoding reader and line reader.
pub mod reader;
/// Plain-text structural importer.
pub mod text;
/// FictionBook-dialect XML parser.
pub mod xml;

pub use error::{IngestError, Result};
pub use reader::{Encoding, RawLine, WindowedReader};
pub use text::{FormatFlags, LineRecord, TextImporter};
pub use xml::XmlParser;

use bookflow_core::DocumentSink;

/// Common seam over the two importers: sniff, parse, rewind.
///
/// Lets callers hold a collection of candidate parsers and pick the first
/// whose `check_format` accepts the stream.
pub trait FormatParser {
    /// Returns true when the stream looks like this parser's format.
    fn check_format(&mut self) -> bool;

    /// Runs the parse, emitting the document into `sink`.
    ///
    /// # Errors
    /// Parser-specific setup failures only; malformed content never errors.
    fn parse(&mut self, sink: &mut dyn DocumentSink) -> Result<()>;

    /// Rewinds to the start of the stream for another pass.
    fn reset(&mut self);

    /// Pins the input charset instead of autodetecting it.
    fn set_charset(&mut self, name: &str);
}

impl FormatParser for TextImporter {
    fn check_format(&mut self) -> bool {
        Self::check_format(self)
    }

    fn parse(&mut self, sink: &mut dyn DocumentSink) -> Result<()> {
        Self::parse(self, sink)
    }

    fn reset(&mut self) {
        Self::reset(self);
    }

    fn set_charset(&mut self, name: &str) {
        Self::set_charset(self, name);
    }
}

impl FormatParser for XmlParser {
    fn check_format(&mut self) -> bool {
        Self::check_format(self)
    }

    fn parse(&mut self, sink: &mut dyn DocumentSink) -> Result<()> {
        Self::parse(self, sink)
    }

    fn reset(&mut self) {
        Self::reset(self);
    }

    fn set_charset(&mut self, name: &str) {
        Self::set_charset(self, name);
    }
}
