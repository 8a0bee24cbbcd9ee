//! Shared helpers for the integration suites.
#![allow(dead_code)]

use bookflow_core::{DocumentEvent, EventCollector, MemoryStream};
use bookflow_ingest::{TextImporter, XmlParser};

/// Runs the plain-text importer over `input` and returns the event log.
pub fn import_text(input: &str) -> EventCollector {
    import_text_bytes(input.as_bytes())
}

/// Runs the plain-text importer over raw bytes and returns the event log.
pub fn import_text_bytes(input: &[u8]) -> EventCollector {
    let mut importer = TextImporter::new(Box::new(MemoryStream::from(input)));
    let mut sink = EventCollector::new();
    importer.parse(&mut sink).expect("text import");
    sink
}

/// Runs the XML parser over `input` and returns the event log.
pub fn parse_xml(input: &str) -> EventCollector {
    let mut parser = XmlParser::new(Box::new(MemoryStream::from(input)));
    parser.set_charset("utf-8");
    let mut sink = EventCollector::new();
    parser.parse(&mut sink).expect("xml parse");
    sink
}

/// Text payloads of `p` elements, in document order.
pub fn paragraph_texts(sink: &EventCollector) -> Vec<String> {
    let mut out = Vec::new();
    let mut in_p = false;
    for event in &sink.events {
        match event {
            DocumentEvent::TagOpen { name, .. } if name == "p" => in_p = true,
            DocumentEvent::TagClose { name, .. } if name == "p" => in_p = false,
            DocumentEvent::Text { text, .. } if in_p => out.push(text.clone()),
            _ => {}
        }
    }
    out
}

/// Count of elements with the given name.
pub fn count_elements(sink: &EventCollector, name: &str) -> usize {
    sink.events
        .iter()
        .filter(|e| matches!(e, DocumentEvent::TagOpen { name: n, .. } if n == name))
        .count()
}
