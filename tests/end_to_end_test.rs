use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use appcat::classifier::TreeEnsemble;
use appcat::features::{FeatureRow, FeatureValue, COLUMNS};
use appcat::form::run_session;
use appcat::{
    AppInputs, ArtifactHandle, ArtifactManager, BundleInfo, CategoryClassifier, CategoryModel,
    ClassifierError, InputForm, LabelEncoder,
};
use mockito::Server;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

async fn local_classifier() -> Result<CategoryClassifier, Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let bundle = BundleInfo::from_local(
        "fixtures",
        fixture("category_model.json"),
        Some(fixture("category_label_encoder.json")),
    );
    let handle = ArtifactHandle::new(ArtifactManager::new(dir.path())?, bundle);
    let artifacts = handle.get().await?;
    Ok(CategoryClassifier::builder().with_artifacts(&artifacts)?.build()?)
}

#[tokio::test]
async fn test_default_inputs_predict_a_category() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = local_classifier().await?;
    let prediction = classifier.predict(&AppInputs::new(500_000_000, 150.0, 4.5, 13.0, 120))?;

    assert_eq!(prediction.row.columns(), &COLUMNS[..]);
    let expected = [
        FeatureValue::Int(500_000_000),
        FeatureValue::Float(150.0),
        FeatureValue::Float(4.5),
        FeatureValue::Str("13.0".into()),
        FeatureValue::Int(120),
        FeatureValue::Str("4+".into()),
        FeatureValue::Int(2023),
        FeatureValue::Int(2024),
        FeatureValue::Int(6),
        FeatureValue::Int(8),
    ];
    assert_eq!(prediction.row.values(), &expected[..]);

    assert_eq!(prediction.label, "Education");
    let top = prediction.top_k.expect("tree ensembles report probabilities");
    assert_eq!(top.len(), 4);
    assert_eq!(top[0].label, "Education");
    let total: f64 = top.iter().map(|r| r.probability).sum();
    assert!((total - 1.0).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_inputs_steer_the_prediction() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = local_classifier().await?;
    let big = classifier.predict(&AppInputs::new(1, 2000.0, 4.5, 13.0, 10))?;
    assert_eq!(big.label, "Games");
    let modern = classifier.predict(&AppInputs::new(1, 150.0, 4.5, 16.0, 10))?;
    assert_eq!(modern.label, "Productivity");
    Ok(())
}

#[tokio::test]
async fn test_missing_artifacts_are_downloaded_once() -> Result<(), Box<dyn std::error::Error>> {
    let model = std::fs::read(fixture("category_model.json"))?;
    let encoder = std::fs::read(fixture("category_label_encoder.json"))?;

    let mut server = Server::new_async().await;
    let model_mock = server
        .mock("GET", "/releases/download/v1.0/category_model.json")
        .with_status(200)
        .with_body(model)
        .expect(1)
        .create_async()
        .await;
    let encoder_mock = server
        .mock("GET", "/releases/download/v1.0/category_label_encoder.json")
        .with_status(200)
        .with_body(encoder)
        .expect(1)
        .create_async()
        .await;

    let base = format!("{}/releases/download/v1.0", server.url());
    let bundle = BundleInfo::from_urls(
        "release-v1.0",
        &format!("{}/category_model.json", base),
        Some(&format!("{}/category_label_encoder.json", base)),
    );
    let dir = tempfile::tempdir()?;
    let manager = ArtifactManager::new(dir.path())?;

    for info in bundle.artifacts() {
        assert!(!manager.is_downloaded(info));
    }

    let handle = ArtifactHandle::new(manager.clone(), bundle.clone());
    let artifacts = handle.get().await?;
    assert_eq!(artifacts.model.n_classes(), Some(4));
    assert_eq!(artifacts.target_encoder.as_ref().map(LabelEncoder::len), Some(4));
    for info in bundle.artifacts() {
        assert!(manager.is_downloaded(info));
    }

    // Later loads in the same process and in a new handle use the cache
    let same = handle.get().await?;
    assert!(Arc::ptr_eq(&artifacts, &same));
    ArtifactHandle::new(manager, bundle).get().await?;

    model_mock.assert_async().await;
    encoder_mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_unreadable_cached_model_is_downloaded_again() -> Result<(), Box<dyn std::error::Error>> {
    let model = std::fs::read(fixture("category_model.json"))?;
    let mut server = Server::new_async().await;
    let model_mock = server
        .mock("GET", "/category_model.json")
        .with_status(200)
        .with_body(model)
        .expect(1)
        .create_async()
        .await;

    let bundle = BundleInfo::from_urls("cached", &format!("{}/category_model.json", server.url()), None);
    let dir = tempfile::tempdir()?;
    let manager = ArtifactManager::new(dir.path())?;
    let cached = manager.get_artifact_path(&bundle.model);
    std::fs::create_dir_all(cached.parent().unwrap())?;
    std::fs::write(&cached, b"{\"feature_names\": [\"Develo")?;

    let artifacts = ArtifactHandle::new(manager, bundle).get().await?;
    assert_eq!(artifacts.model.kind(), "tree-ensemble");
    model_mock.assert_async().await;
    Ok(())
}

/// Wraps the fixture model and fails for apps over 4 GB.
#[derive(Debug)]
struct FlakyModel(TreeEnsemble);

impl CategoryModel for FlakyModel {
    fn n_classes(&self) -> Option<usize> {
        self.0.n_classes()
    }

    fn predict(&self, row: &FeatureRow) -> Result<usize, ClassifierError> {
        match row.get("Size_MB") {
            Some(FeatureValue::Float(size)) if *size > 4096.0 => {
                Err(ClassifierError::ModelError("Size_MB outside the trained range".into()))
            }
            _ => self.0.predict(row),
        }
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<Option<Vec<f64>>, ClassifierError> {
        self.0.predict_proba(row)
    }

    fn kind(&self) -> &'static str {
        "flaky"
    }
}

#[test]
fn test_failed_prediction_does_not_end_the_session() -> Result<(), Box<dyn std::error::Error>> {
    let model = TreeEnsemble::from_file(fixture("category_model.json"))?;
    let encoder = LabelEncoder::from_file(fixture("category_label_encoder.json"))?;
    let classifier = CategoryClassifier::builder()
        .with_model(Arc::new(FlakyModel(model)))?
        .with_label_encoder(encoder)
        .build()?;

    let script = "size-mb=4500\npredict\nbogus\nsize-mb 120\npredict\nquit\npredict\n";
    let mut form = InputForm::default();
    let mut output = Vec::new();
    let summary = run_session(&classifier, &mut form, Cursor::new(script), &mut output, false)?;
    let output = String::from_utf8(output)?;

    assert_eq!(summary.failures, 1);
    assert_eq!(summary.predictions, 1);
    let failed_at = output.find("Prediction failed").expect("failure is reported");
    let succeeded_at = output
        .find("Predicted App Category: Education")
        .expect("later prediction succeeds");
    assert!(failed_at < succeeded_at);
    assert!(output.contains("Unknown command: bogus"));
    Ok(())
}

#[test]
fn test_auto_predict_runs_after_each_edit() -> Result<(), Box<dyn std::error::Error>> {
    let model = TreeEnsemble::from_file(fixture("category_model.json"))?;
    let classifier = CategoryClassifier::builder().with_model(Arc::new(model))?.build()?;

    let mut form = InputForm::default().with_auto_predict(true);
    let mut output = Vec::new();
    let summary = run_session(
        &classifier,
        &mut form,
        Cursor::new("rating=2\nios-version=16\n"),
        &mut output,
        true,
    )?;
    let output = String::from_utf8(output)?;

    assert_eq!(summary.predictions, 2);
    // Without a target encoder the builtin category table names the classes
    assert!(output.contains("Predicted App Category: Book"));
    assert!(output.contains("Required_IOS_Version"));
    assert_eq!(form.values().ios_version, 16.0);
    Ok(())
}
