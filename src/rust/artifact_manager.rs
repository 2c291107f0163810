use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{Client, Response};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

use crate::artifacts::{ArtifactInfo, ArtifactSource};

/// Request timeout for a single artifact download.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(180);

const WRITE_CHUNK_SIZE: usize = 8192;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("Download of {url} failed with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("Download truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
    #[error("Failed to load {path:?}: {reason}")]
    Deserialize { path: PathBuf, reason: String },
}

/// A file returned by [`ArtifactManager::ensure_downloaded`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub path: PathBuf,
    /// `true` if this call fetched the file, `false` if it was already cached
    pub downloaded: bool,
}

/// Downloads, verifies and caches artifacts on local storage.
///
/// Downloads stream into `<file>.part` and are renamed into place only after
/// the whole body arrived and matched its checksum, so a file at the final
/// path is always complete.
#[derive(Clone)]
pub struct ArtifactManager {
    artifacts_dir: PathBuf,
    client: Client,
    timeout: Duration,
    download_lock: Arc<Mutex<()>>,
}

impl ArtifactManager {
    /// Creates a new ArtifactManager with the default artifacts directory
    pub fn new_default() -> Result<Self, ArtifactError> {
        Self::new(Self::get_default_artifacts_dir())
    }

    /// Returns the default artifacts directory path
    pub fn get_default_artifacts_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("APPCAT_CACHE") {
            return PathBuf::from(path).join("artifacts");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("appcat").join("artifacts");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("appcat").join("artifacts");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("appcat").join("artifacts")
    }

    pub fn new<P: AsRef<Path>>(artifacts_dir: P) -> Result<Self, ArtifactError> {
        let artifacts_dir = artifacts_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&artifacts_dir)?;
        Ok(Self {
            artifacts_dir,
            client: Self::build_client(DEFAULT_DOWNLOAD_TIMEOUT)?,
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Replaces the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ArtifactError> {
        self.client = Self::build_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    fn build_client(timeout: Duration) -> Result<Client, ArtifactError> {
        Ok(Client::builder().timeout(timeout).build()?)
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_artifact_path(&self, info: &ArtifactInfo) -> PathBuf {
        match &info.source {
            ArtifactSource::LocalFile(path) => path.clone(),
            _ => self.artifacts_dir.join(&info.bundle).join(&info.file_name),
        }
    }

    /// Whether the artifact can be fetched again from somewhere.
    pub fn is_remote(&self, info: &ArtifactInfo) -> bool {
        !matches!(info.source, ArtifactSource::LocalFile(_))
    }

    pub fn is_downloaded(&self, info: &ArtifactInfo) -> bool {
        let path = self.get_artifact_path(info);
        log::debug!("{} path: {:?} (exists: {})", info.name, path, path.exists());
        path.exists()
    }

    /// Checks a cached file against its configured checksum.
    ///
    /// Returns `false` for a missing file. Without a configured checksum any
    /// existing file passes.
    pub async fn verify(&self, info: &ArtifactInfo) -> Result<bool, ArtifactError> {
        let path = self.get_artifact_path(info);
        if !path.exists() {
            return Ok(false);
        }
        let Some(expected) = &info.sha256 else {
            return Ok(true);
        };
        let hash = hash_file(&path).await?;
        log::debug!("{} hash: {} (expected {})", info.name, hash, expected);
        Ok(&hash == expected)
    }

    /// Downloads an artifact, replacing any cached copy once the new one is complete.
    pub async fn download(&self, info: &ArtifactInfo) -> Result<PathBuf, ArtifactError> {
        if let ArtifactSource::LocalFile(path) = &info.source {
            return Err(ArtifactError::NotDownloaded(format!(
                "{} at {:?} is a local file and cannot be downloaded",
                info.name, path
            )));
        }

        let _lock = self.download_lock.lock().await;
        let path = self.get_artifact_path(info);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let part_path = part_path(&path);
        log::info!("Downloading {} to {:?}", info.name, path);
        match self.download_to(info, &part_path).await {
            Ok(bytes) => {
                fs::rename(&part_path, &path).await?;
                log::info!("{} downloaded ({} bytes)", info.name, bytes);
                Ok(path)
            }
            Err(e) => {
                log::error!("Failed to download {}: {}", info.name, e);
                if let Err(cleanup) = fs::remove_file(&part_path).await {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        log::warn!("Could not remove partial file {:?}: {}", part_path, cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    async fn download_to(&self, info: &ArtifactInfo, part_path: &Path) -> Result<u64, ArtifactError> {
        let mut response = self.request(&info.source).await?;
        let expected_len = response.content_length();

        let file = fs::File::create(part_path).await?;
        let mut writer = BufWriter::with_capacity(WRITE_CHUNK_SIZE, file);
        let mut hasher = Sha256::new();
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            hasher.update(&chunk);
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        writer.get_ref().sync_all().await?;

        if let Some(expected) = expected_len {
            if written != expected {
                return Err(ArtifactError::Truncated { expected, actual: written });
            }
        }

        if let Some(expected) = &info.sha256 {
            let actual = hex::encode(hasher.finalize());
            if &actual != expected {
                return Err(ArtifactError::HashMismatch {
                    file_type: info.name.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Ok(written)
    }

    async fn request(&self, source: &ArtifactSource) -> Result<Response, ArtifactError> {
        match source {
            ArtifactSource::Url(url) => {
                let response = self.client.get(url).send().await?;
                check_status(response)
            }
            ArtifactSource::Drive { base_url, file_id } => {
                let query = [("export", "download"), ("id", file_id.as_str())];
                let first = check_status(self.client.get(base_url).query(&query).send().await?)?;
                let Some(token) = confirm_token(first.headers()) else {
                    return Ok(first);
                };
                log::info!("Drive answered with a download warning, confirming");
                drop(first);
                let response = self
                    .client
                    .get(base_url)
                    .query(&query)
                    .query(&[("confirm", token.as_str())])
                    .send()
                    .await?;
                check_status(response)
            }
            ArtifactSource::LocalFile(path) => Err(ArtifactError::NotDownloaded(format!("{:?}", path))),
        }
    }

    pub fn remove_download(&self, info: &ArtifactInfo) -> Result<(), ArtifactError> {
        if matches!(info.source, ArtifactSource::LocalFile(_)) {
            return Ok(());
        }
        let path = self.get_artifact_path(info);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Ensures that an artifact is on disk and passes verification.
    /// If it doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_downloaded(&self, info: &ArtifactInfo) -> Result<ArtifactFile, ArtifactError> {
        let path = self.get_artifact_path(info);
        if let ArtifactSource::LocalFile(_) = info.source {
            if !path.exists() {
                return Err(ArtifactError::NotDownloaded(format!("{} at {:?}", info.name, path)));
            }
            return Ok(ArtifactFile { path, downloaded: false });
        }

        if self.is_downloaded(info) {
            if self.verify(info).await? {
                log::info!("Using cached {} at {:?}", info.name, path);
                return Ok(ArtifactFile { path, downloaded: false });
            }
            log::warn!("Cached {} failed verification, re-downloading", info.name);
            self.remove_download(info)?;
        } else {
            log::info!("{} not found locally", info.name);
        }

        let path = self.download(info).await?;
        Ok(ArtifactFile { path, downloaded: true })
    }
}

fn check_status(response: Response) -> Result<Response, ArtifactError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ArtifactError::HttpStatus {
            url: response.url().to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Extracts the value of a `download_warning*` cookie, if the response set one.
fn confirm_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim().starts_with("download_warning"))
        .map(|(_, value)| value.trim().to_string())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

async fn hash_file(path: &Path) -> Result<String, ArtifactError> {
    let file = fs::File::open(path).await?;
    let mut reader = BufReader::with_capacity(WRITE_CHUNK_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; WRITE_CHUNK_SIZE];
    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
