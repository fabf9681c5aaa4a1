use criterion::{criterion_group, criterion_main, Criterion};
use rankdex_core::tokenizer::Tokenizer;

const PLOT: &str = "A group of Allied prisoners of war plans a daring escape from a German \
camp. Tunnels are dug, papers are forged, and uniforms are tailored while the guards \
grow suspicious. When the breakout finally happens, seventy-six men crawl into the night, \
and the hunt that follows tests every one of them.";

fn bench_tokenize(c: &mut Criterion) {
    let tokenizer = Tokenizer::default();
    let text = PLOT.repeat(32);
    c.bench_function("tokenize_plot", |b| b.iter(|| tokenizer.tokenize(&text)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
