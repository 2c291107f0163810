use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::Result as OrtResult;
use std::fmt::Display;
use std::sync::OnceLock;

use crate::classifier::ClassifierError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Graph optimization applied when an ONNX model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    Disable,
    Basic,
    Extended,
    #[default]
    All,
}

impl OptimizationLevel {
    fn to_ort(self) -> GraphOptimizationLevel {
        match self {
            Self::Disable => GraphOptimizationLevel::Disable,
            Self::Basic => GraphOptimizationLevel::Level1,
            Self::Extended => GraphOptimizationLevel::Level2,
            Self::All => GraphOptimizationLevel::Level3,
        }
    }
}

/// Session settings for ONNX category models.
///
/// Predictions are single-row and synchronous, so one intra-op thread is the
/// default; `0` lets ONNX Runtime decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub intra_threads: usize,
    pub optimization_level: OptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            intra_threads: 1,
            optimization_level: OptimizationLevel::All,
        }
    }
}

fn init_onnx_environment() -> OrtResult<()> {
    ort::init()
        .with_name("appcat")
        .commit()?;
    Ok(())
}

/// Initializes ONNX Runtime on first use. The outcome is kept, so a failed
/// initialization is reported again on every later call.
pub fn ensure_initialized() -> Result<(), ClassifierError> {
    init_once(&INIT, init_onnx_environment)
}

fn init_once<E, F>(cell: &OnceLock<Result<(), String>>, init: F) -> Result<(), ClassifierError>
where
    E: Display,
    F: FnOnce() -> Result<(), E>,
{
    cell.get_or_init(|| init().map_err(|e| e.to_string()))
        .clone()
        .map_err(|e| ClassifierError::BuildError(format!("ONNX Runtime initialization failed: {}", e)))
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(config.optimization_level.to_ort())?;

    Ok(builder)
}
