use std::path::PathBuf;
use std::sync::Arc;

use appcat::classifier::TreeEnsemble;
use appcat::features::{DefaultBundle, IosVersionMode, RowBuilder};
use appcat::{AppInputs, CategoryClassifier, LabelEncoder};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn setup_benchmark_classifier(top_k: usize) -> CategoryClassifier {
    let model = TreeEnsemble::from_file(fixture("category_model.json")).unwrap();
    let encoder = LabelEncoder::from_file(fixture("category_label_encoder.json")).unwrap();
    CategoryClassifier::builder()
        .with_model(Arc::new(model))
        .unwrap()
        .with_label_encoder(encoder)
        .with_top_k(top_k)
        .unwrap()
        .build()
        .unwrap()
}

fn bench_row_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("Row building");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let inputs = AppInputs::default();
    let raw = RowBuilder::new(DefaultBundle::default(), IosVersionMode::Raw).unwrap();
    group.bench_function("raw_ios_version", |b| b.iter(|| raw.build(black_box(&inputs)).unwrap()));

    let versions: Vec<String> = (10..=17).map(|v| format!("{}.0", v)).collect();
    let encoded = RowBuilder::new(
        DefaultBundle::default(),
        IosVersionMode::Encoded(LabelEncoder::fit(versions)),
    )
    .unwrap();
    group.bench_function("encoded_ios_version", |b| {
        b.iter(|| encoded.build(black_box(&inputs)).unwrap())
    });

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("Prediction");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let inputs = [
        ("default_inputs", AppInputs::default()),
        ("large_app", AppInputs::new(1_200_000_000, 3000.0, 3.9, 15.0, 700)),
    ];
    for top_k in [1, 5] {
        let classifier = setup_benchmark_classifier(top_k);
        for (name, input) in &inputs {
            group.bench_function(format!("{}_top{}", name, top_k), |b| {
                b.iter(|| classifier.predict(black_box(input)).unwrap())
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_row_building, bench_prediction);
criterion_main!(benches);
