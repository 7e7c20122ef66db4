// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
#![allow(dead_code)]

use docweave_engine::{Delta, Document, Registry};

/// Prose paragraphs with bold runs, a quote every tenth paragraph
pub fn generate_ops(paragraphs: usize) -> Delta {
    let mut delta = Delta::new();
    for index in 0..paragraphs {
        let block = if index % 10 == 9 { "quote" } else { "content" };
        delta = delta
            .insert("The quick brown fox jumps over the lazy dog, ", None)
            .insert(
                format!("paragraph {index}"),
                Some(docweave_engine::Attributes::new().with("bold", true)),
            )
            .insert(" and keeps running across the page until it wraps.", None)
            .insert_count(
                1,
                Some(
                    docweave_engine::Attributes::new()
                        .with("frag", "paraEnd")
                        .with("block", block),
                ),
            );
    }
    delta
}

pub fn generate_document(paragraphs: usize) -> Document {
    Document::from_ops(&generate_ops(paragraphs), &Registry::default())
}
