//! Criterion benchmarks for the Sapa request path.
//!
//! - Text normalization with and without stop words and lemmas
//! - End-to-end request handling, single and batched

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use sapa::analysis::{NormalizerConfig, SlangDictionary, TextNormalizer};
use sapa::engine::InferenceEngine;
use sapa::ml::{IntentSample, Trainer};
use sapa::response::{IntentResponseMap, ResponseResolver};

/// Generate chat messages for benchmarking.
fn generate_messages(count: usize) -> Vec<String> {
    let words = [
        "gmn", "cara", "daftar", "ulang", "mhs", "baru", "jadwal", "kuliah", "kpn", "ujian",
        "biaya", "semester", "yg", "harus", "dibayar", "thx", "info", "beasiswa", "dosen",
        "pembimbing", "What", "are", "the", "tuition", "fees?", "classes!",
    ];

    (0..count)
        .map(|i| {
            let len = 3 + (i % 12);
            (0..len)
                .map(|j| words[(i * 7 + j * 13) % words.len()])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn sample_engine() -> InferenceEngine {
    let normalizer = Arc::new(TextNormalizer::default());
    let samples = vec![
        IntentSample::new("halo", "greeting"),
        IntentSample::new("hi there", "greeting"),
        IntentSample::new("jadwal kuliah kapan", "jadwal"),
        IntentSample::new("kpn jadwal ujian", "jadwal"),
        IntentSample::new("berapa biaya semester", "biaya"),
        IntentSample::new("biaya yg harus dibayar", "biaya"),
        IntentSample::new("gmn cara daftar ulang", "daftar"),
        IntentSample::new("info beasiswa mhs baru", "beasiswa"),
    ];
    let context = Trainer::new(Arc::clone(&normalizer))
        .fit(&samples)
        .and_then(|model| model.into_context())
        .unwrap();
    let resolver = ResponseResolver::new(
        IntentResponseMap::from_pairs([
            ("greeting", "Hello! How can I help?"),
            ("jadwal", "Jadwal ada di portal akademik."),
            ("biaya", "Biaya semester tercantum di SIAKAD."),
            ("daftar", "Daftar ulang dilakukan di BAAK."),
        ]),
        "Sorry, I didn't understand that. Could you rephrase?",
    );
    InferenceEngine::new(normalizer, Arc::new(context), resolver).unwrap()
}

/// Benchmark text normalization.
fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let messages = generate_messages(1000);

    let plain = TextNormalizer::default();
    let full = TextNormalizer::new(
        NormalizerConfig {
            remove_stopwords: true,
            lemmatize: true,
            extra_stopwords: vec![],
        },
        Arc::new(SlangDictionary::new()),
    )
    .unwrap();

    group.bench_function("normalize_single", |b| {
        b.iter(|| black_box(plain.normalize(black_box(&messages[0]))))
    });

    group.throughput(Throughput::Elements(100));
    group.bench_function("normalize_batch_plain", |b| {
        b.iter(|| {
            for message in messages.iter().take(100) {
                black_box(plain.normalize(black_box(message)));
            }
        })
    });
    group.bench_function("normalize_batch_stopwords_lemmas", |b| {
        b.iter(|| {
            for message in messages.iter().take(100) {
                black_box(full.normalize(black_box(message)));
            }
        })
    });

    group.finish();
}

/// Benchmark end-to-end request handling.
fn bench_handle(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle");
    let engine = sample_engine();
    let messages = generate_messages(1000);

    group.bench_function("handle_single", |b| {
        b.iter(|| black_box(engine.handle(black_box(&messages[1]))))
    });

    group.throughput(Throughput::Elements(messages.len() as u64));
    group.bench_function("handle_batch_parallel", |b| {
        b.iter(|| black_box(engine.handle_batch(black_box(&messages))))
    });

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_handle);
criterion_main!(benches);
