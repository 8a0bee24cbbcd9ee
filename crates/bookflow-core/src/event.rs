//! Document event model.
//!
//! Parsers in `bookflow-ingest` do not build a document themselves; they push
//! a flat stream of events into a [`DocumentSink`]. Sinks are invoked
//! synchronously from inside the parse loop, in strict document order, and
//! must not retain borrowed buffers beyond the call.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Whitespace-handling flags attached to text events.
    ///
    /// `TRIM` requests inner-whitespace normalisation; the `ALLOW_*` bits
    /// relax edge trimming; `PRE` suppresses all normalisation and wins over
    /// the rest.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextFlags: u32 {
        /// Normalise inner whitespace.
        const TRIM = 1;
        /// Keep leading whitespace when trimming.
        const TRIM_ALLOW_START_SPACE = 1 << 1;
        /// Keep trailing whitespace when trimming.
        const TRIM_ALLOW_END_SPACE = 1 << 2;
        /// Remove a trailing hyphen when joining wrapped lines.
        const TRIM_REMOVE_EOL_HYPHENS = 1 << 3;
        /// Preserve all whitespace verbatim.
        const PRE = 1 << 4;
    }
}

/// Receiver for the structured document event stream.
///
/// All callbacks are synchronous and return nothing; a sink that fans out is
/// responsible for its own synchronisation. `on_start`/`on_stop` bracket one
/// parse session; `on_encoding` reports a mid-stream charset switch (XML
/// declaration only).
///
/// Attribute events arrive in definition order, between the opening
/// `on_tag_open` and the next `on_tag_open`/`on_text`. For text events the
/// `(fpos, fsize)` byte range is non-decreasing and contiguous per logical
/// text node.
pub trait DocumentSink {
    /// A parse session begins.
    fn on_start(&mut self) {}

    /// The parse session ended (end of stream included).
    fn on_stop(&mut self) {}

    /// The input charset changed mid-stream.
    ///
    /// `table` is the upper-half translation table now in effect, if the new
    /// charset is an 8-bit codepage with a known mapping.
    fn on_encoding(&mut self, _name: &str, _table: Option<&[char; 128]>) {}

    /// An element opened. `ns` is the syntactic namespace prefix, if any.
    fn on_tag_open(&mut self, ns: Option<&str>, name: &str);

    /// An element closed.
    fn on_tag_close(&mut self, ns: Option<&str>, name: &str);

    /// An attribute of the most recently opened element.
    fn on_attribute(&mut self, ns: Option<&str>, name: &str, value: &str);

    /// A chunk of text content.
    ///
    /// `fpos`/`fsize` give the absolute byte range of the chunk's source;
    /// `flags` carry the whitespace policy the producer applied or expects.
    fn on_text(&mut self, text: &str, fpos: u64, fsize: u64, flags: TextFlags);
}

/// One recorded document event.
///
/// The owned mirror of the [`DocumentSink`] callbacks, for sinks and tests
/// that need to hold the stream rather than react to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentEvent {
    /// Session start.
    Start,
    /// Session end.
    Stop,
    /// Charset switch.
    Encoding {
        /// Normalised charset name.
        name: String,
        /// Upper-half translation table (128 entries), for 8-bit codepages.
        table: Option<Vec<char>>,
    },
    /// Element open.
    TagOpen {
        /// Namespace prefix, if the name was `ns:local`.
        ns: Option<String>,
        /// Local element name.
        name: String,
    },
    /// Element close.
    TagClose {
        /// Namespace prefix, if any.
        ns: Option<String>,
        /// Local element name.
        name: String,
    },
    /// Attribute of the open element.
    Attribute {
        /// Namespace prefix, if any.
        ns: Option<String>,
        /// Attribute name.
        name: String,
        /// Attribute value, raw (entity references are not decoded in values).
        value: String,
    },
    /// Text content with its source byte range.
    Text {
        /// The decoded, pre-processed text.
        text: String,
        /// Absolute byte offset of the chunk's source.
        fpos: u64,
        /// Byte length of the chunk's source.
        fsize: u64,
        /// Whitespace policy flags.
        #[serde(with = "bitflags::serde")]
        flags: TextFlags,
    },
}

/// A sink that records every event, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCollector {
    /// Recorded events, in arrival order.
    pub events: Vec<DocumentEvent>,
}

impl EventCollector {
    /// Creates an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// All `TagOpen` names, in order. Convenience for assertions.
    #[must_use]
    pub fn opened_tags(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DocumentEvent::TagOpen { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// All text payloads, in order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DocumentEvent::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DocumentSink for EventCollector {
    fn on_start(&mut self) {
        self.events.push(DocumentEvent::Start);
    }

    fn on_stop(&mut self) {
        self.events.push(DocumentEvent::Stop);
    }

    fn on_encoding(&mut self, name: &str, table: Option<&[char; 128]>) {
        self.events.push(DocumentEvent::Encoding {
            name: name.to_string(),
            table: table.map(|t| t.to_vec()),
        });
    }

    fn on_tag_open(&mut self, ns: Option<&str>, name: &str) {
        self.events.push(DocumentEvent::TagOpen {
            ns: ns.map(str::to_string),
            name: name.to_string(),
        });
    }

    fn on_tag_close(&mut self, ns: Option<&str>, name: &str) {
        self.events.push(DocumentEvent::TagClose {
            ns: ns.map(str::to_string),
            name: name.to_string(),
        });
    }

    fn on_attribute(&mut self, ns: Option<&str>, name: &str, value: &str) {
        self.events.push(DocumentEvent::Attribute {
            ns: ns.map(str::to_string),
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn on_text(&mut self, text: &str, fpos: u64, fsize: u64, flags: TextFlags) {
        self.events.push(DocumentEvent::Text {
            text: text.to_string(),
            fpos,
            fsize,
            flags,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_records_in_order() {
        let mut sink = EventCollector::new();
        sink.on_start();
        sink.on_tag_open(None, "p");
        sink.on_text("hello", 0, 5, TextFlags::TRIM);
        sink.on_tag_close(None, "p");
        sink.on_stop();

        assert_eq!(sink.events.len(), 5);
        assert_eq!(sink.opened_tags(), vec!["p"]);
        assert_eq!(sink.texts(), vec!["hello"]);
        assert_eq!(sink.events[0], DocumentEvent::Start);
        assert_eq!(sink.events[4], DocumentEvent::Stop);
    }

    #[test]
    fn test_collector_keeps_namespace_and_attrs() {
        let mut sink = EventCollector::new();
        sink.on_tag_open(Some("xlink"), "image");
        sink.on_attribute(Some("xlink"), "href", "#cover");

        match &sink.events[1] {
            DocumentEvent::Attribute { ns, name, value } => {
                assert_eq!(ns.as_deref(), Some("xlink"));
                assert_eq!(name, "href");
                assert_eq!(value, "#cover");
            }
            other => panic!("expected attribute event, got {other:?}"),
        }
    }

    #[test]
    fn test_text_flags_are_independent_bits() {
        let flags = TextFlags::TRIM | TextFlags::TRIM_REMOVE_EOL_HYPHENS;
        assert!(flags.contains(TextFlags::TRIM));
        assert!(!flags.contains(TextFlags::PRE));
        assert_eq!(flags.bits(), 0b1001);
    }

    #[test]
    fn test_default_callbacks_are_optional() {
        // A sink may implement only the tag/text callbacks.
        struct CountOnly(usize);
        impl DocumentSink for CountOnly {
            fn on_tag_open(&mut self, _: Option<&str>, _: &str) {
                self.0 += 1;
            }
            fn on_tag_close(&mut self, _: Option<&str>, _: &str) {}
            fn on_attribute(&mut self, _: Option<&str>, _: &str, _: &str) {}
            fn on_text(&mut self, _: &str, _: u64, _: u64, _: TextFlags) {}
        }

        let mut sink = CountOnly(0);
        sink.on_start();
        sink.on_tag_open(None, "body");
        sink.on_encoding("utf-8", None);
        assert_eq!(sink.0, 1);
    }
}
