//! Benchmarks for hidden text parsing and reconciliation.
//!
//! Run with: cargo bench
//!
//! Pages are synthetic: rows of eight-letter words in a page/line/word tree.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use redjvu::model::{PageText, ZoneRecord, ZoneType};
use redjvu::reconcile::{self, Reconciliation};

/// Creates the `print-txt` output of a page with `lines` lines.
fn create_page_text(lines: usize, words_per_line: usize) -> String {
    let mut text = format!("(page 0 0 {} {}\n", words_per_line * 100, lines * 20);
    for row in 0..lines {
        let y0 = row * 20;
        text.push_str(&format!(
            " (line 0 {} {} {}",
            y0,
            words_per_line * 100,
            y0 + 15
        ));
        for col in 0..words_per_line {
            let x0 = col * 100;
            text.push_str(&format!(
                " (word {} {} {} {} \"w{:03}r{:03}\")",
                x0,
                y0,
                x0 + 90,
                y0 + 15,
                row,
                col
            ));
        }
        text.push_str(")\n");
    }
    text.push(')');
    text
}

fn parse_record(input: &str) -> ZoneRecord {
    let expr = redjvu::sexpr::parse(input).unwrap();
    ZoneRecord::from_expr(&expr).unwrap()
}

/// Benchmark s-expression parsing and arena construction.
fn bench_text_loading(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_loading");

    for lines in [10, 50, 200].iter() {
        let input = create_page_text(*lines, 10);

        group.bench_function(format!("{}_lines", lines), |b| {
            b.iter(|| {
                let expr = redjvu::sexpr::parse(black_box(&input)).unwrap();
                PageText::new(0, Some(&expr)).unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark mapping edited text back onto the zones.
fn bench_import_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("import_text");

    for lines in [10, 50, 200].iter() {
        let record = parse_record(&create_page_text(*lines, 10));
        let original = reconcile::export_text(&record).unwrap();
        // Edit every other line: one substitution, one split, one merge.
        let edited: String = original
            .lines()
            .enumerate()
            .map(|(i, line)| {
                let line = if i % 2 == 0 {
                    line.replacen('r', "R", 1).replacen("r001", "r 001", 1).replacen(" w", "w", 1)
                } else {
                    line.to_string()
                };
                line + "\n"
            })
            .collect();

        group.bench_function(format!("{}_lines", lines), |b| {
            b.iter(|| {
                let outcome = reconcile::import_text(black_box(&record), black_box(&edited));
                assert!(matches!(outcome, Ok(Reconciliation::Reconciled(_))));
            });
        });
    }

    group.finish();
}

/// Benchmark stripping words down to lines.
fn bench_strip(c: &mut Criterion) {
    let record = parse_record(&create_page_text(200, 10));

    c.bench_function("strip_words", |b| {
        b.iter(|| black_box(record.clone()).strip(ZoneType::Word));
    });
}

criterion_group!(benches, bench_text_loading, bench_import_text, bench_strip);
criterion_main!(benches);
