//! Incrementally parse XML from stdin, printing each top-level element as it
//! completes.
//!
//! Run with: cargo run --example stream_parse < feed.xml

use std::io::BufRead;

use laxml_core::{ParseOptions, ParseStream};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = ParseStream::new(0, ParseOptions::default());
    let stdin = std::io::stdin();

    let mut count = 0usize;
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        for item in stream.feed(&line)? {
            count += 1;
            if let Some(el) = item.as_element() {
                println!("#{count}: <{}> with {} children", el.name, el.children.len());
            }
        }
    }
    for item in stream.finish()? {
        count += 1;
        if let Some(el) = item.as_element() {
            println!("#{count}: <{}> with {} children", el.name, el.children.len());
        }
    }

    eprintln!("{count} top-level items");
    Ok(())
}
