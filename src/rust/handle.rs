use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::OnceCell;

use crate::artifact_manager::{ArtifactError, ArtifactManager};
use crate::artifacts::{ArtifactInfo, BundleInfo};
use crate::classifier::{load_model, CategoryModel};
use crate::encoder::LabelEncoder;
use crate::runtime::RuntimeConfig;

/// Everything a deployment needs to predict, loaded once and never mutated.
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub bundle: String,
    pub model: Arc<dyn CategoryModel>,
    pub target_encoder: Option<LabelEncoder>,
    pub ios_encoder: Option<LabelEncoder>,
}

/// Lazily downloads and deserializes a bundle the first time it is asked for.
///
/// Concurrent callers of [`ArtifactHandle::get`] share one initialization; a
/// failed initialization is not cached, so a later call tries again.
pub struct ArtifactHandle {
    manager: ArtifactManager,
    bundle: BundleInfo,
    runtime_config: RuntimeConfig,
    loaded: OnceCell<Arc<LoadedArtifacts>>,
}

impl ArtifactHandle {
    pub fn new(manager: ArtifactManager, bundle: BundleInfo) -> Self {
        Self {
            manager,
            bundle,
            runtime_config: RuntimeConfig::default(),
            loaded: OnceCell::new(),
        }
    }

    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    pub fn bundle(&self) -> &BundleInfo {
        &self.bundle
    }

    pub fn manager(&self) -> &ArtifactManager {
        &self.manager
    }

    /// Returns the loaded artifacts, loading them on first use.
    pub async fn get(&self) -> Result<Arc<LoadedArtifacts>, ArtifactError> {
        self.loaded
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    /// The artifacts if a previous [`get`](Self::get) succeeded.
    pub fn loaded(&self) -> Option<Arc<LoadedArtifacts>> {
        self.loaded.get().cloned()
    }

    /// Deletes every cached file of the bundle so the next load downloads fresh copies.
    pub fn remove_downloads(&self) -> Result<(), ArtifactError> {
        for info in self.bundle.artifacts() {
            self.manager.remove_download(info)?;
        }
        Ok(())
    }

    async fn load(&self) -> Result<Arc<LoadedArtifacts>, ArtifactError> {
        info!("Loading bundle {}", self.bundle.name);

        let target_encoder = match &self.bundle.target_encoder {
            Some(info) => Some(self.fetch_and_parse(info, read_encoder).await?),
            None => None,
        };
        let ios_encoder = match &self.bundle.ios_encoder {
            Some(info) => Some(self.fetch_and_parse(info, read_encoder).await?),
            None => None,
        };

        let n_classes = target_encoder.as_ref().map(LabelEncoder::len);
        let runtime_config = &self.runtime_config;
        let model = self
            .fetch_and_parse(&self.bundle.model, |path| {
                load_model(path, runtime_config, n_classes).map_err(|e| e.to_string())
            })
            .await?;

        info!("Bundle {} ready ({} model)", self.bundle.name, model.kind());
        Ok(Arc::new(LoadedArtifacts {
            bundle: self.bundle.name.clone(),
            model,
            target_encoder,
            ios_encoder,
        }))
    }

    /// Makes sure the file is present, then parses it. A cached file that
    /// fails to parse is treated as a leftover of an interrupted download:
    /// it is fetched again once before the failure is reported.
    async fn fetch_and_parse<T, F>(&self, info: &ArtifactInfo, parse: F) -> Result<T, ArtifactError>
    where
        F: Fn(&Path) -> Result<T, String>,
    {
        let file = self.manager.ensure_downloaded(info).await?;
        match parse(&file.path) {
            Ok(value) => Ok(value),
            Err(reason) if !file.downloaded && self.manager.is_remote(info) => {
                warn!("Cached {} is unreadable ({}), downloading again", info.name, reason);
                self.manager.remove_download(info)?;
                let path = self.manager.download(info).await?;
                parse(&path).map_err(|reason| ArtifactError::Deserialize { path, reason })
            }
            Err(reason) => Err(ArtifactError::Deserialize { path: file.path, reason }),
        }
    }
}

fn read_encoder(path: &Path) -> Result<LabelEncoder, String> {
    LabelEncoder::from_file(path)
}
