use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use appcat::form::{predict_once, run_session};
use appcat::{
    AppConfig, AppInputs, ArtifactHandle, ArtifactInfo, ArtifactManager, ArtifactSource,
    BuiltinBundle, BundleInfo, CategoryClassifier, ContentRating, DefaultBundle, InputForm,
};
use clap::Parser;
use log::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force a fresh download of the model files
    #[arg(short, long)]
    fresh: bool,

    /// Cache root for downloaded artifacts (overrides APPCAT_CACHE)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Request timeout for artifact downloads, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Number of ranked categories to show
    #[arg(long)]
    top_k: Option<usize>,

    /// Intra-op threads for ONNX models (0 lets ONNX Runtime decide)
    #[arg(long)]
    intra_threads: Option<usize>,

    /// Local model file (.json tree ensemble or .onnx)
    #[arg(long, conflicts_with_all = ["model_url", "drive_model_id"])]
    model_path: Option<PathBuf>,

    /// Local target label encoder
    #[arg(long, requires = "model_path")]
    encoder_path: Option<PathBuf>,

    /// Local encoder for Required_IOS_Version; switches the row to encoded mode
    #[arg(long)]
    ios_encoder_path: Option<PathBuf>,

    /// Model download URL
    #[arg(long, conflicts_with = "drive_model_id")]
    model_url: Option<String>,

    /// Target label encoder download URL
    #[arg(long, requires = "model_url")]
    encoder_url: Option<String>,

    /// Cloud-drive file id of the model
    #[arg(long)]
    drive_model_id: Option<String>,

    /// Cloud-drive file id of the target label encoder
    #[arg(long, requires = "drive_model_id")]
    drive_encoder_id: Option<String>,

    /// Expected SHA-256 of the model file
    #[arg(long)]
    model_sha256: Option<String>,

    /// Expected SHA-256 of the target label encoder
    #[arg(long)]
    encoder_sha256: Option<String>,

    /// Edit the inputs line by line and predict on demand
    #[arg(short, long)]
    interactive: bool,

    /// In interactive mode, predict after every field change
    #[arg(long, requires = "interactive")]
    auto: bool,

    /// Print the feature row sent to the model
    #[arg(long)]
    show_row: bool,

    /// Developer ID
    #[arg(long, default_value_t = 500_000_000)]
    developer_id: u64,

    /// App size in MB
    #[arg(long, default_value_t = 150.0, allow_negative_numbers = true)]
    size_mb: f64,

    /// Average user rating (0.0 to 5.0)
    #[arg(long, default_value_t = 4.5, allow_negative_numbers = true)]
    rating: f64,

    /// Minimum iOS version (1.0 to 20.0)
    #[arg(long, default_value_t = 13.0)]
    ios_version: f64,

    /// Days between release and last update
    #[arg(long, default_value_t = 120)]
    time_gap: u32,

    /// Content rating used for every prediction
    #[arg(long, default_value = "4+", help_heading = "Advanced")]
    content_rating: ContentRating,

    #[arg(long, default_value_t = 2023, help_heading = "Advanced")]
    release_year: i32,

    #[arg(long, default_value_t = 2024, help_heading = "Advanced")]
    updated_year: i32,

    #[arg(long, default_value_t = 6, help_heading = "Advanced")]
    updated_month: u8,

    #[arg(long, default_value_t = 8, help_heading = "Advanced")]
    release_month: u8,
}

impl Args {
    fn config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::from_env()?;
        if let Some(cache_dir) = &self.cache_dir {
            config.artifacts_dir = cache_dir.join("artifacts");
        }
        if let Some(secs) = self.timeout_secs {
            config.download_timeout = Duration::from_secs(secs);
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if let Some(threads) = self.intra_threads {
            config.runtime.intra_threads = threads;
        }
        config.defaults = DefaultBundle::new(
            self.content_rating,
            self.release_year,
            self.updated_year,
            self.updated_month,
            self.release_month,
        )?;
        Ok(config)
    }

    fn bundle(&self) -> BundleInfo {
        let mut bundle = if let Some(model) = &self.model_path {
            BundleInfo::from_local("local", model.clone(), self.encoder_path.clone())
        } else if let Some(url) = &self.model_url {
            BundleInfo::from_urls("custom", url, self.encoder_url.as_deref())
        } else if let Some(id) = &self.drive_model_id {
            BundleInfo::from_drive("drive", id, self.drive_encoder_id.as_deref())
        } else {
            BuiltinBundle::ReleaseV1.info()
        };

        if let Some(sha) = &self.model_sha256 {
            bundle.model = bundle.model.with_sha256(sha.as_str());
        }
        if let Some(sha) = &self.encoder_sha256 {
            bundle.target_encoder = bundle
                .target_encoder
                .map(|encoder| encoder.with_sha256(sha.as_str()));
        }
        if let Some(path) = &self.ios_encoder_path {
            let file_name = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            let info = ArtifactInfo::new(
                bundle.name.clone(),
                "iOS version encoder",
                file_name,
                ArtifactSource::LocalFile(path.clone()),
            );
            bundle = bundle.with_ios_encoder(info);
        }
        bundle
    }

    fn inputs(&self) -> AppInputs {
        AppInputs::new(
            self.developer_id,
            self.size_mb,
            self.rating,
            self.ios_version,
            self.time_gap,
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.config()?;

    info!("=== Starting App Store Category Predictor ===");
    let start_time = Instant::now();

    let manager = ArtifactManager::new(&config.artifacts_dir)?.with_timeout(config.download_timeout)?;
    let handle = ArtifactHandle::new(manager, args.bundle()).with_runtime_config(config.runtime.clone());

    if args.fresh {
        info!("Fresh download requested - removing any existing artifact files...");
        handle.remove_downloads()?;
    }

    let artifacts = handle
        .get()
        .await
        .context("Model or encoder could not be loaded")?;

    let classifier = CategoryClassifier::builder()
        .with_artifacts(&artifacts)?
        .with_defaults(config.defaults.clone())
        .with_top_k(config.top_k)?
        .build()?;
    let classifier_info = classifier.info();
    info!(
        "=== Classifier ready: {} model, {} classes, iOS version {} (took {:.2?}) ===",
        classifier_info.model_kind,
        classifier_info
            .num_classes
            .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
        classifier_info.ios_version_mode,
        start_time.elapsed()
    );

    let stdout = io::stdout();
    let mut output = stdout.lock();
    if args.interactive {
        let mut form = InputForm::new(args.inputs()).with_auto_predict(args.auto);
        let summary = run_session(&classifier, &mut form, io::stdin().lock(), &mut output, args.show_row)?;
        info!("{} predictions, {} failed", summary.predictions, summary.failures);
        return Ok(());
    }

    if !predict_once(&classifier, &args.inputs(), &mut output, args.show_row)? {
        bail!("Prediction failed");
    }
    Ok(())
}
