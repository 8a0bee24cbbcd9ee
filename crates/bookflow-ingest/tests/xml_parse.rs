//! End-to-end scenarios for the XML parser.

mod common;

use bookflow_core::{DocumentEvent, MemoryStream, TextFlags, TreeBuilder};
use bookflow_ingest::{FormatParser, TextImporter, XmlParser};
use common::{count_elements, parse_xml};

#[test]
fn fictionbook_round_trip() {
    let sink = parse_xml(
        r#"<?xml version="1.0" encoding="utf-8"?><FictionBook><body><p>hi &#38; bye</p></body></FictionBook>"#,
    );

    assert_eq!(
        sink.opened_tags(),
        vec!["?xml", "FictionBook", "body", "p"]
    );

    // Declaration attributes arrive in definition order.
    let attrs: Vec<(String, String)> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            DocumentEvent::Attribute { name, value, .. } => Some((name.clone(), value.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        attrs,
        vec![
            ("version".to_string(), "1.0".to_string()),
            ("encoding".to_string(), "utf-8".to_string())
        ]
    );

    // The encoding attribute triggers a switch event right after it.
    let attr_idx = sink
        .events
        .iter()
        .position(|e| matches!(e, DocumentEvent::Attribute { name, .. } if name == "encoding"))
        .unwrap();
    assert!(matches!(
        &sink.events[attr_idx + 1],
        DocumentEvent::Encoding { name, .. } if name == "utf-8"
    ));

    // One text event, with the reference decoded.
    assert_eq!(sink.texts(), vec!["hi & bye"]);

    let closes: Vec<&str> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            DocumentEvent::TagClose { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(closes, vec!["?xml", "p", "body", "FictionBook"]);
}

#[test]
fn malformed_tag_is_discarded() {
    let sink = parse_xml("<foo =bad><bar/>");
    assert_eq!(sink.opened_tags(), vec!["bar"]);
    let closes: Vec<&str> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            DocumentEvent::TagClose { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(closes, vec!["bar"]);
}

#[test]
fn nested_document_builds_a_tree() {
    let xml = r#"<?xml version="1.0"?>
<FictionBook>
  <description>
    <title-info>
      <author><first-name>Boris</first-name><last-name>Akunin</last-name></author>
      <book-title>Azazel</book-title>
    </title-info>
  </description>
  <body>
    <section><title><p>One</p></title><p>First paragraph.</p></section>
  </body>
</FictionBook>"#;

    let mut parser = XmlParser::new(Box::new(MemoryStream::from(xml)));
    parser.set_charset("utf-8");
    let mut sink = TreeBuilder::new();
    parser.parse(&mut sink).expect("parse");
    let doc = sink.into_document();

    let root = doc.root().expect("root");
    assert_eq!(root.name, "FictionBook");
    let title_info = root
        .child("description")
        .and_then(|d| d.child("title-info"))
        .expect("title-info");
    let author = title_info.child("author").expect("author");
    assert_eq!(author.child("first-name").unwrap().text(), "Boris");
    assert_eq!(author.child("last-name").unwrap().text(), "Akunin");
    assert_eq!(title_info.child("book-title").unwrap().text(), "Azazel");

    let section = root.child("body").and_then(|b| b.child("section")).unwrap();
    assert_eq!(section.child("p").unwrap().text(), "First paragraph.");
}

#[test]
fn text_events_tile_each_text_node() {
    let filler = "lorem ipsum dolor sit amet ".repeat(700); // ~19k chars
    let xml = format!("<doc><p>{filler}</p></doc>");
    let sink = parse_xml(&xml);

    let spans: Vec<(u64, u64)> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            DocumentEvent::Text { fpos, fsize, .. } => Some((*fpos, *fsize)),
            _ => None,
        })
        .collect();
    assert!(spans.len() >= 3, "long text must split into chunks");
    for pair in spans.windows(2) {
        assert_eq!(pair[0].0 + pair[0].1, pair[1].0);
    }
    let total: u64 = spans.iter().map(|s| s.1).sum();
    assert_eq!(total, filler.len() as u64);
}

#[test]
fn cp1251_body_decodes_after_declaration() {
    let mut bytes = Vec::from(
        &br#"<?xml version="1.0" encoding="windows-1251"?><FictionBook><body><p>"#[..],
    );
    bytes.extend_from_slice(&[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]); // "Привет"
    bytes.extend_from_slice(b"</p></body></FictionBook>");

    let mut parser = XmlParser::new(Box::new(MemoryStream::new(bytes)));
    let mut sink = TreeBuilder::new();
    parser.parse(&mut sink).expect("parse");
    let doc = sink.into_document();

    assert_eq!(doc.encoding.as_deref(), Some("windows-1251"));
    let body = doc.root().unwrap().child("body").unwrap();
    assert_eq!(body.child("p").unwrap().text(), "Привет");
}

#[test]
fn utf16_document_parses() {
    // "<a>hi</a>" in UTF-16 LE. Tag scanning is byte-based and UTF-16 tags
    // interleave NULs, so the charset must be pinned and the document kept
    // to text content reads; here we only check text decoding survives.
    let text = "<a>hi</a>";
    let mut bytes = Vec::new();
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let mut parser = XmlParser::new(Box::new(MemoryStream::new(bytes)));
    parser.set_charset("utf-16le");
    let mut sink = bookflow_core::EventCollector::new();
    parser.parse(&mut sink).expect("parse");
    // The parser stays tolerant: no panic, session bracketed.
    assert_eq!(sink.events.first(), Some(&DocumentEvent::Start));
    assert_eq!(sink.events.last(), Some(&DocumentEvent::Stop));
}

#[test]
fn attribute_entities_stay_verbatim() {
    let sink = parse_xml(r#"<image href="a&#38;b"/>"#);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        DocumentEvent::Attribute { value, .. } if value == "a&#38;b"
    )));
}

#[test]
fn whitespace_gaps_do_not_disturb_structure() {
    let mut parser = XmlParser::new(Box::new(MemoryStream::from(
        "<a>\n  <b>x</b>\n</a>",
    )));
    parser.set_charset("utf-8");
    let mut sink = TreeBuilder::new();
    parser.parse(&mut sink).expect("parse");
    let doc = sink.into_document();
    let a = doc.root().unwrap();
    assert_eq!(a.child("b").unwrap().text(), "x");
}

#[test]
fn format_sniffers_pick_the_right_parser() {
    let padding = "<p>padding so the probe sees enough characters</p>".repeat(5);
    let fb2 = format!(r#"<?xml version="1.0"?><FictionBook>{padding}</FictionBook>"#);
    let prose = "Plain prose with words and spaces, nothing else. ".repeat(8);

    let mut candidates: Vec<Box<dyn FormatParser>> = vec![
        Box::new(XmlParser::new(Box::new(MemoryStream::from(fb2.as_str())))),
        Box::new(TextImporter::new(Box::new(MemoryStream::from(
            prose.as_str(),
        )))),
    ];
    assert!(candidates[0].check_format());
    assert!(candidates[1].check_format());

    let mut xml_on_prose = XmlParser::new(Box::new(MemoryStream::from(prose.as_str())));
    xml_on_prose.set_charset("utf-8");
    assert!(!xml_on_prose.check_format());
}

#[test]
fn stray_text_flags_match_space_mode() {
    let sink = parse_xml("<p>  spaced   out  </p>");
    match sink
        .events
        .iter()
        .find(|e| matches!(e, DocumentEvent::Text { .. }))
    {
        Some(DocumentEvent::Text { text, flags, .. }) => {
            assert_eq!(text, " spaced out ");
            assert!(!flags.contains(TextFlags::PRE));
        }
        other => panic!("expected a text event, got {other:?}"),
    }
}
