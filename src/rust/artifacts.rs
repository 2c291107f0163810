use std::path::PathBuf;

/// Base URL of the pinned release that hosts the builtin bundle.
pub const RELEASE_BASE_URL: &str =
    "https://github.com/Abdulqadir05/app-store-category-predictor/releases/download/v1.0";

/// Download endpoint for cloud-drive shares.
pub const DRIVE_BASE_URL: &str = "https://docs.google.com/uc";

/// Where an artifact comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// A direct HTTP(S) download, e.g. a release asset.
    Url(String),
    /// A cloud-drive share that may answer with a download-warning cookie
    /// before serving the file.
    Drive { base_url: String, file_id: String },
    /// A file that already lives on disk and is never downloaded.
    LocalFile(PathBuf),
}

/// Information about a downloadable artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    /// Bundle directory the file is cached under
    pub bundle: String,
    /// Human readable role, used in logs and errors ("model", "label encoder")
    pub name: String,
    pub file_name: String,
    pub source: ArtifactSource,
    /// Lowercase hex SHA-256 of the file; `None` disables checksum validation
    pub sha256: Option<String>,
}

impl ArtifactInfo {
    pub fn new(
        bundle: impl Into<String>,
        name: impl Into<String>,
        file_name: impl Into<String>,
        source: ArtifactSource,
    ) -> Self {
        Self {
            bundle: bundle.into(),
            name: name.into(),
            file_name: file_name.into(),
            source,
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into().to_ascii_lowercase());
        self
    }
}

/// The set of artifacts one deployment loads together.
///
/// A bundle with an `ios_encoder` encodes `Required_IOS_Version` before it
/// enters the feature row; a bundle without one passes the version string through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    pub name: String,
    pub model: ArtifactInfo,
    pub target_encoder: Option<ArtifactInfo>,
    pub ios_encoder: Option<ArtifactInfo>,
}

impl BundleInfo {
    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactInfo> {
        std::iter::once(&self.model)
            .chain(self.target_encoder.iter())
            .chain(self.ios_encoder.iter())
    }

    /// A bundle served from plain URLs.
    pub fn from_urls(name: &str, model_url: &str, target_encoder_url: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            model: ArtifactInfo::new(name, "model", file_name_of(model_url, "model.json"),
                ArtifactSource::Url(model_url.to_string())),
            target_encoder: target_encoder_url.map(|url| {
                ArtifactInfo::new(name, "label encoder", file_name_of(url, "category_label_encoder.json"),
                    ArtifactSource::Url(url.to_string()))
            }),
            ios_encoder: None,
        }
    }

    /// A bundle served from cloud-drive share ids.
    pub fn from_drive(name: &str, model_id: &str, target_encoder_id: Option<&str>) -> Self {
        let drive = |file_id: &str| ArtifactSource::Drive {
            base_url: DRIVE_BASE_URL.to_string(),
            file_id: file_id.to_string(),
        };
        Self {
            name: name.to_string(),
            model: ArtifactInfo::new(name, "model", "category_model.json", drive(model_id)),
            target_encoder: target_encoder_id.map(|id| {
                ArtifactInfo::new(name, "label encoder", "category_label_encoder.json", drive(id))
            }),
            ios_encoder: None,
        }
    }

    /// A bundle read straight from disk.
    pub fn from_local(name: &str, model: PathBuf, target_encoder: Option<PathBuf>) -> Self {
        let local = |role: &str, path: PathBuf| {
            let file_name = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            ArtifactInfo::new(name, role, file_name, ArtifactSource::LocalFile(path))
        };
        Self {
            name: name.to_string(),
            model: local("model", model),
            target_encoder: target_encoder.map(|path| local("label encoder", path)),
            ios_encoder: None,
        }
    }

    pub fn with_ios_encoder(mut self, info: ArtifactInfo) -> Self {
        self.ios_encoder = Some(info);
        self
    }
}

fn file_name_of(url: &str, fallback: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Bundles that ship with the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinBundle {
    /// Model and target label encoder from the `v1.0` release.
    ReleaseV1,
}

impl BuiltinBundle {
    pub fn info(&self) -> BundleInfo {
        match self {
            Self::ReleaseV1 => BundleInfo::from_urls(
                "release-v1.0",
                &format!("{}/category_model.json", RELEASE_BASE_URL),
                Some(&format!("{}/category_label_encoder.json", RELEASE_BASE_URL)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_bundle() {
        let bundle = BuiltinBundle::ReleaseV1.info();
        assert_eq!(bundle.model.file_name, "category_model.json");
        assert_eq!(bundle.target_encoder.as_ref().unwrap().file_name, "category_label_encoder.json");
        assert!(matches!(&bundle.model.source, ArtifactSource::Url(url) if url.contains("/download/v1.0/")));
        assert_eq!(bundle.artifacts().count(), 2);
    }

    #[test]
    fn test_file_name_of_ignores_query() {
        assert_eq!(file_name_of("https://host/a/b/model.onnx?raw=1", "x"), "model.onnx");
        assert_eq!(file_name_of("https://host/a/", "x"), "x");
    }

    #[test]
    fn test_sha256_is_lowercased() {
        let info = ArtifactInfo::new("b", "model", "m.json", ArtifactSource::Url("u".into()))
            .with_sha256("ABCDEF");
        assert_eq!(info.sha256.as_deref(), Some("abcdef"));
    }
}
