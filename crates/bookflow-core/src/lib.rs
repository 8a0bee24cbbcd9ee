//! # bookflow-core
//!
//! Shared substrate for the bookflow ingestion pipeline.
//!
//! The parsers in `bookflow-ingest` read bytes through a [`BookStream`],
//! resolve legacy charsets through a [`CodepageProvider`], and report what
//! they find as a flat event stream into a [`DocumentSink`]. This crate owns
//! those three contracts plus two ready-made sinks.
//!
//! ## Contracts
//!
//! | Item | Role |
//! |------|------|
//! | [`BookStream`] | Seekable, finite byte source (`MemoryStream`, `FileStream` provided) |
//! | [`CodepageProvider`] | Charset name → translation table; byte window → charset guess |
//! | [`DocumentSink`] | Synchronous receiver of tag/attribute/text events |
//!
//! ## Sinks
//!
//! | Item | Role |
//! |------|------|
//! | [`EventCollector`] | Records the raw event stream (tests, debugging) |
//! | [`TreeBuilder`] | Folds events into a serializable [`Document`] tree |
//!
//! ## Quick start
//!
//! ```rust
//! use bookflow_core::{DocumentSink, TextFlags, TreeBuilder};
//!
//! let mut sink = TreeBuilder::new();
//! sink.on_start();
//! sink.on_tag_open(None, "body");
//! sink.on_text("hello", 0, 5, TextFlags::TRIM);
//! sink.on_tag_close(None, "body");
//! sink.on_stop();
//!
//! let doc = sink.into_document();
//! assert_eq!(doc.root().unwrap().text(), "hello");
//! ```

/// Codepage tables and charset autodetection.
pub mod charset;
/// Document event model: sink trait, event enum, text flags.
pub mod event;
/// Byte stream contract and stock implementations.
pub mod stream;
/// Document tree assembly from the event stream.
pub mod tree;

pub use charset::{BuiltinCodepages, CodepageProvider, DetectedEncoding};
pub use event::{DocumentEvent, DocumentSink, EventCollector, TextFlags};
pub use stream::{BookStream, FileStream, MemoryStream};
pub use tree::{Attribute, Document, Element, Node, TextSpan, TreeBuilder};
