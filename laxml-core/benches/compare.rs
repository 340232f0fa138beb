//! Comparison against quick-xml on the same document.
//!
//! Not apples-to-apples (quick-xml is a pull tokenizer, we build a tree);
//! this is a sanity bound, not a scoreboard.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quick_xml::events::Event;
use quick_xml::Reader;

fn sample_document(items: usize) -> String {
    let mut out = String::from("<rss version=\"2.0\"><channel>");
    for i in 0..items {
        out.push_str(&format!(
            "<item><title>Item {i}</title><link>http://example.com/{i}</link></item>"
        ));
    }
    out.push_str("</channel></rss>");
    out
}

fn bench_compare(c: &mut Criterion) {
    let doc = sample_document(500);
    let mut group = c.benchmark_group("compare");

    group.bench_function("laxml", |b| {
        b.iter(|| laxml_core::parse(black_box(&doc)).unwrap().len())
    });

    group.bench_function("quick-xml", |b| {
        b.iter(|| {
            let mut reader = Reader::from_str(black_box(&doc));
            let mut count = 0usize;
            loop {
                match reader.read_event() {
                    Ok(Event::Eof) => break,
                    Ok(_) => count += 1,
                    Err(_) => break,
                }
            }
            count
        })
    });

    group.finish();
}

criterion_group!(benches, bench_compare);
criterion_main!(benches);
