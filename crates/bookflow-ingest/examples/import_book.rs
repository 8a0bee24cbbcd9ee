//! Imports a book file (plain text or FictionBook XML) and prints a summary.
//!
//! Usage: `cargo run --example import_book -- path/to/book.txt`

use anyhow::{bail, Context, Result};

use bookflow_core::{FileStream, TreeBuilder};
use bookflow_ingest::{FormatParser, TextImporter, XmlParser};

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .context("usage: import_book <file>")?;

    let mut candidates: Vec<(&str, Box<dyn FormatParser>)> = vec![
        (
            "fictionbook-xml",
            Box::new(XmlParser::new(Box::new(FileStream::open(&path)?))),
        ),
        (
            "plain-text",
            Box::new(TextImporter::new(Box::new(FileStream::open(&path)?))),
        ),
    ];

    for (label, parser) in &mut candidates {
        if !parser.check_format() {
            continue;
        }
        println!("{path}: importing as {label}");
        let mut sink = TreeBuilder::new();
        parser.parse(&mut sink)?;
        let doc = sink.into_document();

        if let Some(encoding) = &doc.encoding {
            println!("  encoding: {encoding}");
        }
        let Some(root) = doc.root() else {
            println!("  (no root element)");
            return Ok(());
        };
        println!("  root: <{}>", root.name);
        if let Some(title) = root
            .child("description")
            .and_then(|d| d.child("title-info"))
            .and_then(|t| t.child("book-title"))
        {
            println!("  title: {}", title.text());
        }
        let paragraphs = root.child("body").map(count_paragraphs_deep).unwrap_or(0);
        println!("  paragraphs: {paragraphs}");
        return Ok(());
    }

    bail!("{path}: not recognized as text or FictionBook XML");
}

fn count_paragraphs_deep(element: &bookflow_core::Element) -> usize {
    let mut count = 0;
    for node in &element.children {
        if let bookflow_core::Node::Element(child) = node {
            if child.name == "p" {
                count += 1;
            }
            count += count_paragraphs_deep(child);
        }
    }
    count
}
