use appcat::{ArtifactError, ArtifactInfo, ArtifactManager, ArtifactSource};
use mockito::{Matcher, Server};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const BODY: &[u8] = br#"{"classes": ["Education", "Games"]}"#;

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn url_artifact(server: &Server, file: &str) -> ArtifactInfo {
    ArtifactInfo::new(
        "test-bundle",
        "label encoder",
        file,
        ArtifactSource::Url(format!("{}/{}", server.url(), file)),
    )
}

#[tokio::test]
async fn test_download_writes_file_atomically() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/encoder.json")
        .with_status(200)
        .with_body(BODY)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir()?;
    let manager = ArtifactManager::new(dir.path())?;
    let info = url_artifact(&server, "encoder.json").with_sha256(sha256_hex(BODY));

    assert!(!manager.is_downloaded(&info));
    let file = manager.ensure_downloaded(&info).await?;
    assert!(file.downloaded);
    assert_eq!(std::fs::read(&file.path)?, BODY);
    assert!(manager.verify(&info).await?);
    assert!(!file.path.with_file_name("encoder.json.part").exists());

    // Cached and valid: no second request
    let again = manager.ensure_downloaded(&info).await?;
    assert!(!again.downloaded);

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_http_error_leaves_nothing_behind() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/encoder.json")
        .with_status(404)
        .create_async()
        .await;

    let dir = tempfile::tempdir()?;
    let manager = ArtifactManager::new(dir.path())?;
    let info = url_artifact(&server, "encoder.json");

    let err = manager.download(&info).await.unwrap_err();
    assert!(matches!(err, ArtifactError::HttpStatus { status: 404, .. }));
    let path = manager.get_artifact_path(&info);
    assert!(!path.exists());
    assert!(!path.with_file_name("encoder.json.part").exists());
    Ok(())
}

#[tokio::test]
async fn test_checksum_mismatch_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/encoder.json")
        .with_status(200)
        .with_body(BODY)
        .create_async()
        .await;

    let dir = tempfile::tempdir()?;
    let manager = ArtifactManager::new(dir.path())?;
    let info = url_artifact(&server, "encoder.json").with_sha256("0".repeat(64));

    let err = manager.ensure_downloaded(&info).await.unwrap_err();
    assert!(matches!(err, ArtifactError::HashMismatch { .. }));
    assert!(!manager.is_downloaded(&info));
    Ok(())
}

#[tokio::test]
async fn test_stale_cached_file_is_replaced() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/encoder.json")
        .with_status(200)
        .with_body(BODY)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir()?;
    let manager = ArtifactManager::new(dir.path())?;
    let info = url_artifact(&server, "encoder.json").with_sha256(sha256_hex(BODY));

    let path = manager.get_artifact_path(&info);
    std::fs::create_dir_all(path.parent().unwrap())?;
    std::fs::write(&path, b"{\"classes\": [\"Ed")?;
    assert!(!manager.verify(&info).await?);

    let file = manager.ensure_downloaded(&info).await?;
    assert!(file.downloaded);
    assert_eq!(std::fs::read(&path)?, BODY);

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_drive_download_confirms_warning() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new_async().await;
    let warning = server
        .mock("GET", "/uc")
        .match_query(Matcher::Exact("export=download&id=abc123".into()))
        .with_status(200)
        .with_header("set-cookie", "download_warning_4821=tok9; Path=/uc")
        .with_body("<html>Google Drive can't scan this file for viruses.</html>")
        .expect(1)
        .create_async()
        .await;
    let confirmed = server
        .mock("GET", "/uc")
        .match_query(Matcher::Exact("export=download&id=abc123&confirm=tok9".into()))
        .with_status(200)
        .with_body(BODY)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir()?;
    let manager = ArtifactManager::new(dir.path())?;
    let info = ArtifactInfo::new(
        "drive",
        "label encoder",
        "category_label_encoder.json",
        ArtifactSource::Drive {
            base_url: format!("{}/uc", server.url()),
            file_id: "abc123".into(),
        },
    );

    let path = manager.download(&info).await?;
    assert_eq!(std::fs::read(path)?, BODY);

    warning.assert_async().await;
    confirmed.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_drive_download_without_warning() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new_async().await;
    let direct = server
        .mock("GET", "/uc")
        .match_query(Matcher::UrlEncoded("id".into(), "small".into()))
        .with_status(200)
        .with_body(BODY)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir()?;
    let manager = ArtifactManager::new(dir.path())?;
    let info = ArtifactInfo::new(
        "drive",
        "label encoder",
        "small.json",
        ArtifactSource::Drive {
            base_url: format!("{}/uc", server.url()),
            file_id: "small".into(),
        },
    );

    let path = manager.download(&info).await?;
    assert_eq!(std::fs::read(path)?, BODY);
    direct.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_local_files_are_never_downloaded() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let manager = ArtifactManager::new(dir.path().join("cache"))?;
    let local = dir.path().join("encoder.json");
    std::fs::write(&local, BODY)?;
    let info = ArtifactInfo::new("local", "label encoder", "encoder.json", ArtifactSource::LocalFile(local.clone()));

    let file = manager.ensure_downloaded(&info).await?;
    assert_eq!(file.path, local);
    assert!(!file.downloaded);
    assert!(matches!(manager.download(&info).await, Err(ArtifactError::NotDownloaded(_))));

    manager.remove_download(&info)?;
    assert!(local.exists());
    Ok(())
}

/// Serves one response that promises more bytes than it sends, then hangs up.
async fn short_body_server() -> Result<String, std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\n{\"classes\": [\"Edu")
                .await;
            let _ = socket.shutdown().await;
        }
    });
    Ok(format!("http://{}", addr))
}

#[tokio::test]
async fn test_truncated_body_leaves_nothing_behind() -> Result<(), Box<dyn std::error::Error>> {
    let base = short_body_server().await?;
    let dir = tempfile::tempdir()?;
    let manager = ArtifactManager::new(dir.path())?;
    let info = ArtifactInfo::new(
        "test-bundle",
        "label encoder",
        "encoder.json",
        ArtifactSource::Url(format!("{}/encoder.json", base)),
    );

    let err = manager.ensure_downloaded(&info).await.unwrap_err();
    assert!(
        matches!(err, ArtifactError::Truncated { expected: 4096, .. } | ArtifactError::DownloadError(_)),
        "unexpected error: {}",
        err
    );
    let path = manager.get_artifact_path(&info);
    assert!(!path.exists());
    assert!(!path.with_file_name("encoder.json.part").exists());
    Ok(())
}
