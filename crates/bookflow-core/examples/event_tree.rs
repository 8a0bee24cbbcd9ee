//! Feeds a small event stream into the tree builder and prints the
//! assembled document as JSON.

use bookflow_core::{DocumentSink, TextFlags, TreeBuilder};

fn main() {
    let mut sink = TreeBuilder::new();
    sink.on_start();
    sink.on_tag_open(None, "FictionBook");
    sink.on_tag_open(None, "body");
    sink.on_tag_open(None, "section");
    sink.on_tag_open(None, "p");
    sink.on_text("A paragraph assembled by hand.", 0, 30, TextFlags::TRIM);
    sink.on_tag_close(None, "p");
    sink.on_tag_close(None, "section");
    sink.on_tag_close(None, "body");
    sink.on_tag_close(None, "FictionBook");
    sink.on_stop();

    let doc = sink.into_document();
    match serde_json::to_string_pretty(&doc) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("serialization failed: {err}"),
    }
}
