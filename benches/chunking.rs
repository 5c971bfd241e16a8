use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use vault_indexer::embeddings::chunking::{ChunkingConfig, chunk_text};

fn synthetic_notes(paragraphs: usize) -> String {
    let mut text = String::new();
    for i in 0..paragraphs {
        text.push_str(&format!("# Section {i}\n\n"));
        text.push_str(
            &"Discussed roadmap priorities and follow-ups with the platform team. "
                .repeat(12),
        );
        text.push_str("\n\n");
    }
    text
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let config = ChunkingConfig::default();

    let small = synthetic_notes(4);
    c.bench_function("chunk_small_note", |b| {
        b.iter(|| chunk_text(black_box(&small), black_box(&config)))
    });

    let large = synthetic_notes(200);
    c.bench_function("chunk_large_note", |b| {
        b.iter(|| chunk_text(black_box(&large), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
