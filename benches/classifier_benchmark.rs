use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jaguar_sense::{corpus, HashingEmbedder, LexiconTagger, SenseClassifier, TextNormalizer};

fn setup_benchmark_classifier() -> SenseClassifier {
    let classifier = SenseClassifier::builder()
        .with_embedder(Arc::new(HashingEmbedder::default()))
        .build()
        .unwrap();
    let (texts, labels) = corpus::reference_corpus();
    classifier.train(&texts, &labels).unwrap();
    classifier
}

const LONG_TEXT: &str = "The jaguar is the largest cat species in the Americas, and it hunts \
    deer, capybara and caimans along the rivers of the rainforest, while the Jaguar \
    sedan parked outside the dealer showroom offers a supercharged engine, leather \
    seats and a luxurious ride for anyone who test drives it on the highway.";

fn bench_preprocessing(c: &mut Criterion) {
    let normalizer = TextNormalizer::new(Arc::new(LexiconTagger::builtin().unwrap()));
    let mut group = c.benchmark_group("Preprocessing");

    group.bench_function("clean", |b| {
        b.iter(|| TextNormalizer::clean(black_box(LONG_TEXT)))
    });
    group.bench_function("categorize", |b| {
        b.iter(|| normalizer.categorize(black_box(LONG_TEXT)))
    });
    group.bench_function("reference_batch", |b| {
        b.iter(|| normalizer.preprocess_batch(black_box(&corpus::REFERENCE_SENTENCES)))
    });

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let (texts, labels) = corpus::reference_corpus();
    let classifier = SenseClassifier::builder()
        .with_embedder(Arc::new(HashingEmbedder::default()))
        .build()
        .unwrap();

    let mut group = c.benchmark_group("Training");
    group.sample_size(10);
    group.bench_function("reference_corpus", |b| {
        b.iter(|| classifier.train(black_box(&texts), black_box(&labels)).unwrap())
    });
    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let classifier = setup_benchmark_classifier();
    let mut group = c.benchmark_group("Prediction");

    group.bench_function("short_text", |b| {
        b.iter(|| classifier.predict(black_box("The jaguar hunts.")).unwrap())
    });
    group.bench_function("long_text", |b| {
        b.iter(|| classifier.predict(black_box(LONG_TEXT)).unwrap())
    });
    group.bench_function("probe_batch", |b| {
        b.iter(|| classifier.predict_batch(black_box(&corpus::PROBE_SENTENCES)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_preprocessing, bench_training, bench_prediction);
criterion_main!(benches);
