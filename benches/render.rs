use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::path::Path;

use eml2html::parser::tree::{parse_message, ParserOptions};
use eml2html::render::{convert_to_html, RenderOptions};

fn bench_clean_content_type(c: &mut Criterion) {
    let inputs = [
        "text/html; charset=\"utf-8\"",
        "text/html; ;;;; ;;; charset=\"utf-16\"  ;",
        "text/html; charset:\"utf-16\"",
        "text/plain; latin1",
        "text/plain; charset=3Dutf-16",
        "",
    ];

    c.bench_function("clean_content_type", |b| {
        b.iter(|| {
            for input in &inputs {
                black_box(eml2html::parser::content_type::clean(black_box(input)));
            }
        })
    });
}

fn bench_convert_complex(c: &mut Criterion) {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("complex.eml");
    let raw = std::fs::read(&fixture_path).unwrap();
    let parser_options = ParserOptions::default();
    let render_options = RenderOptions::default();

    c.bench_function("parse_complex", |b| {
        b.iter(|| parse_message(black_box(&raw), &parser_options))
    });

    let root = parse_message(&raw, &parser_options);
    c.bench_function("convert_complex", |b| {
        b.iter(|| convert_to_html(black_box(&root), &render_options).unwrap())
    });
}

criterion_group!(benches, bench_clean_content_type, bench_convert_complex);
criterion_main!(benches);
