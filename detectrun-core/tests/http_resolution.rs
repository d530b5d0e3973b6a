//! HTTP behavior of version resolution, artifact fetching, and download
//! streaming, against local mock servers.

use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use detectrun_core::coordinate::{resolve_version, Coordinate};
use detectrun_core::downloader::download_file;
use detectrun_core::fetcher::{fetch_detect_jar, fetch_scan_cli};
use detectrun_core::repository::{repository_list, LocalRepository, RemoteRepository};
use detectrun_core::resolver::resolve_artifact;
use detectrun_core::settings::DetectSettings;

const LATEST_TEMPLATE: &str = "%s/api/search/latestVersion?g=%s&a=%s&repos=%s";

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn settings_in(temp: &TempDir, artifactory_base: &str) -> DetectSettings {
    let mut settings = DetectSettings::default();
    settings.build_dir = temp.path().join("target");
    settings.local_repository = Some(temp.path().join("repository"));
    settings.artifactory_base = artifactory_base.to_string();
    settings.artifact_repository_name = "bds-integrations-release".to_string();
    settings
}

#[tokio::test]
async fn latest_version_is_verbatim_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search/latestVersion"))
        .and(query_param("g", "com.synopsys.integration"))
        .and(query_param("a", "synopsys-detect"))
        .and(query_param("repos", "bds-integrations-release"))
        .respond_with(ResponseTemplate::new(200).set_body_string("6.1.0"))
        .mount(&server)
        .await;

    let coordinate: Coordinate = "com.synopsys.integration:synopsys-detect:latest"
        .parse()
        .unwrap();
    let version = resolve_version(
        &client(),
        &coordinate,
        LATEST_TEMPLATE,
        &server.uri(),
        "bds-integrations-release",
    )
    .await;
    assert_eq!(version, "6.1.0");
}

#[tokio::test]
async fn latest_version_falls_back_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search/latestVersion"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let coordinate: Coordinate = "g:a:latest".parse().unwrap();
    let version = resolve_version(&client(), &coordinate, LATEST_TEMPLATE, &server.uri(), "r").await;
    assert_eq!(version, "5.2.0");
}

#[tokio::test]
async fn concrete_version_makes_no_network_calls() {
    let server = MockServer::start().await;

    let coordinate: Coordinate = "g:a:9.3.0".parse().unwrap();
    let version = resolve_version(&client(), &coordinate, LATEST_TEMPLATE, &server.uri(), "r").await;
    assert_eq!(version, "9.3.0");

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn detect_jar_fetch_is_idempotent_against_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(
            "/bds-integrations-release/com/synopsys/integration/synopsys-detect/6.1.0/synopsys-detect-6.1.0.jar",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jar bytes".as_slice()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut settings = settings_in(&temp, &server.uri());
    settings.executable_gav = "com.synopsys.integration:synopsys-detect:6.1.0".to_string();

    let repositories = repository_list(
        &settings.artifactory_base,
        &settings.artifact_repository_name,
        &settings.repositories,
    );
    let local = LocalRepository::new(settings.local_repository_path());

    let (cache, version) = fetch_detect_jar(&client(), &settings, &repositories, &local)
        .await
        .unwrap();
    assert_eq!(version, "6.1.0");
    assert_eq!(fs::read(&cache).unwrap(), b"jar bytes");

    // Second fetch: cache populated, no further network traffic (the
    // expect(1) on the mock enforces it).
    let (cache_again, _) = fetch_detect_jar(&client(), &settings, &repositories, &local)
        .await
        .unwrap();
    assert_eq!(cache, cache_again);
}

#[tokio::test]
async fn detect_jar_falls_back_to_legacy_coordinates() {
    let server = MockServer::start().await;
    // The configured coordinates miss (unmatched requests get 404); only
    // the legacy coordinates are served.
    Mock::given(method("GET"))
        .and(path(
            "/bds-integrations-release/com/blackducksoftware/integration/hub-detect/5.2.0/hub-detect-5.2.0.jar",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"legacy jar".as_slice()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut settings = settings_in(&temp, &server.uri());
    settings.executable_gav = "com.synopsys.integration:synopsys-detect:9.9.9".to_string();

    let repositories = repository_list(
        &settings.artifactory_base,
        &settings.artifact_repository_name,
        &settings.repositories,
    );
    let local = LocalRepository::new(settings.local_repository_path());

    let (cache, version) = fetch_detect_jar(&client(), &settings, &repositories, &local)
        .await
        .unwrap();
    assert_eq!(version, "9.9.9");
    assert_eq!(fs::read(&cache).unwrap(), b"legacy jar");
}

#[tokio::test]
async fn scan_cli_download_publishes_into_local_repository() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/scan.cli.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"scan cli zip".as_slice()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut settings = settings_in(&temp, "http://127.0.0.1:9/artifactory");
    settings.scan_cli_download_url = format!("{}/download/scan.cli.zip", server.uri());

    let local = LocalRepository::new(settings.local_repository_path());
    let cache = fetch_scan_cli(&client(), &settings, "5.2.0", &local)
        .await
        .unwrap();

    assert_eq!(fs::read(&cache).unwrap(), b"scan cli zip");

    // The freshly downloaded archive was published for future resolution.
    let coordinate: Coordinate = settings.scan_cli_gav.parse().unwrap();
    let published = local.find(&coordinate, "5.2.0", "zip").unwrap();
    assert_eq!(fs::read(&published).unwrap(), b"scan cli zip");
}

#[tokio::test]
async fn scan_cli_force_download_skips_resolution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/scan.cli.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh zip".as_slice()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut settings = settings_in(&temp, "http://127.0.0.1:9/artifactory");
    settings.scan_cli_download_url = format!("{}/download/scan.cli.zip", server.uri());
    settings.force_scan_cli_download = true;

    let local = LocalRepository::new(settings.local_repository_path());

    // A locally resolvable copy exists, but the force flag bypasses it.
    let coordinate: Coordinate = settings.scan_cli_gav.parse().unwrap();
    local
        .publish(&stage_file(&temp, b"stale zip"), &coordinate, "5.2.0", "zip")
        .unwrap();

    let cache = fetch_scan_cli(&client(), &settings, "5.2.0", &local)
        .await
        .unwrap();
    assert_eq!(fs::read(&cache).unwrap(), b"fresh zip");
}

fn stage_file(temp: &TempDir, contents: &[u8]) -> std::path::PathBuf {
    let path = temp.path().join("staged.zip");
    fs::write(&path, contents).unwrap();
    path
}

/// A raw HTTP stub that answers every request with a 200 advertising
/// `advertised_len` bytes, then writes `chunks` one at a time with a short
/// pause between them and closes the connection. Advertising more than it
/// sends simulates a transport failure mid-body.
async fn stub_http_server(advertised_len: usize, chunks: Vec<Vec<u8>>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let chunks = chunks.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    advertised_len
                );
                let _ = socket.write_all(header.as_bytes()).await;
                for chunk in &chunks {
                    let _ = socket.write_all(chunk).await;
                    let _ = socket.flush().await;
                    tokio::time::sleep(std::time::Duration::from_millis(25)).await;
                }
            });
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn interrupted_download_leaves_no_artifact_behind() {
    // The remote dies after 7 of 100 advertised bytes.
    let server = stub_http_server(100, vec![b"partial".to_vec()]).await;

    let temp = TempDir::new().unwrap();
    let local = LocalRepository::new(temp.path().join("repository"));
    let coordinate: Coordinate = "g:a:1.0".parse().unwrap();
    let remotes = vec![RemoteRepository::new("flaky", server)];

    let err = resolve_artifact(&client(), &coordinate, "1.0", "jar", &remotes, &local)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"));

    // The truncated body must not land at the repository path; a later
    // local-only resolution misses instead of returning a corrupt file.
    assert!(local.find(&coordinate, "1.0", "jar").is_none());
    let err = resolve_artifact(&client(), &coordinate, "1.0", "jar", &[], &local)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn progress_fires_once_per_percent_change() {
    // Four bytes delivered one at a time: 25% per chunk.
    let server = stub_http_server(
        4,
        vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()],
    )
    .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("out.bin");
    let percents = std::sync::Mutex::new(Vec::new());

    let bytes = download_file(&client(), &format!("{}/file", server), &dest, |progress| {
        percents.lock().unwrap().push(progress.percent.unwrap());
    })
    .await
    .unwrap();

    assert_eq!(bytes, 4);
    assert_eq!(fs::read(&dest).unwrap(), b"abcd");
    assert!(!temp.path().join("out.bin.part").exists());

    // One callback per percentage value, never a repeat.
    let percents = percents.lock().unwrap();
    assert_eq!(percents.first(), Some(&0));
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.windows(2).all(|pair| pair[0] < pair[1]));
}
