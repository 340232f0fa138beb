//! Parse a small document and print the tree plus its simplified form.
//!
//! Run with: cargo run --example simple_parse

use laxml_core::{parse, simplify, stringify};

fn main() {
    let input = r#"<?xml version="1.0"?>
<library>
    <book id="1" available><title>The Rust Book</title></book>
    <book id="2"><title>Parsing, Badly</title></book>
</library>"#;

    let doc = parse(input).expect("parse failed");

    println!("tree:\n{:#?}\n", doc);
    println!("re-serialized:\n{}\n", stringify(&doc));
    println!(
        "simplified:\n{}",
        serde_json::to_string_pretty(&simplify(&doc)).expect("json failed")
    );
}
