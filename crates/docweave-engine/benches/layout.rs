use criterion::{Criterion, criterion_group, criterion_main};
use docweave_engine::layout::LineBreaker;
use docweave_engine::{Layout, LayoutContext, MonospacePlatform};
mod common;

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    group.sample_size(10);

    let platform = MonospacePlatform::default();
    let doc = common::generate_document(200);

    group.bench_function("full_layout", |b| {
        b.iter(|| {
            let mut d = doc.clone();
            d.layout(&LayoutContext::new(&platform), std::hint::black_box(480.0));
            std::hint::black_box(d.height());
        });
    });

    group.bench_function("relayout_unchanged", |b| {
        let mut d = doc.clone();
        d.layout(&LayoutContext::new(&platform), 480.0);
        b.iter(|| {
            d.layout(&LayoutContext::new(&platform), std::hint::black_box(480.0));
        });
    });

    let text = "The quick brown fox jumps over the lazy dog. 日本語のテキストも混ざる。".repeat(50);
    group.bench_function("line_breaker", |b| {
        b.iter(|| {
            let breaks = LineBreaker::new(std::hint::black_box(&text)).count();
            std::hint::black_box(breaks);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_layout);
criterion_main!(benches);
