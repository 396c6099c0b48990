//! Integration tests for the document downloader
//!
//! These tests use wiremock to serve documents and failures, and check the
//! retry policy and the files left on disk.

use company_crawler::config::DownloadSettings;
use company_crawler::download::{DownloadOutcome, Downloader};
use reqwest::Client;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF_BODY: &[u8] = b"%PDF-1.4 test document";

/// Settings with short timeouts and backoff so failures resolve quickly
fn fast_settings(max_retries: u32) -> DownloadSettings {
    DownloadSettings {
        max_retries,
        timeout: Duration::from_secs(5),
        chunk_timeout: Duration::from_secs(2),
        probe_timeout: Duration::from_secs(2),
        backoff_unit: Duration::from_millis(10),
        ..Default::default()
    }
}

fn downloader(max_retries: u32) -> Downloader {
    Downloader::new(Client::new(), fast_settings(max_retries), 4)
}

async fn mount_head_ok(server: &MockServer) {
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_succeeds_after_transient_failures() {
    let server = MockServer::start().await;
    mount_head_ok(&server).await;

    // First two GETs fail, the third succeeds
    Mock::given(method("GET"))
        .and(path("/relatorio.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/relatorio.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BODY.to_vec(), "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = downloader(3)
        .download(&format!("{}/relatorio.pdf", server.uri()), dir.path())
        .await;

    match outcome {
        DownloadOutcome::Downloaded {
            path,
            file_type,
            bytes,
        } => {
            assert_eq!(path, dir.path().join("relatorio.pdf"));
            assert_eq!(file_type, "pdf");
            assert_eq!(bytes, PDF_BODY.len() as u64);
            assert_eq!(std::fs::read(&path).unwrap(), PDF_BODY);
        }
        other => panic!("expected a download, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fails_after_exhausting_retries() {
    let server = MockServer::start().await;
    mount_head_ok(&server).await;

    Mock::given(method("GET"))
        .and(path("/instavel.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = downloader(3)
        .download(&format!("{}/instavel.pdf", server.uri()), dir.path())
        .await;

    assert!(!outcome.is_success());
    assert!(outcome.local_path().is_none());
    assert!(!dir.path().join("instavel.pdf").exists());
}

#[tokio::test]
async fn test_existing_file_is_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BODY.to_vec(), "application/pdf"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("ata.pdf"), b"already here").unwrap();

    let outcome = downloader(3)
        .download(&format!("{}/atas/ata.pdf", server.uri()), dir.path())
        .await;

    assert_eq!(
        outcome,
        DownloadOutcome::AlreadyPresent {
            path: dir.path().join("ata.pdf"),
            file_type: "pdf".to_string(),
        }
    );
    assert_eq!(
        std::fs::read(dir.path().join("ata.pdf")).unwrap(),
        b"already here"
    );
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/removido.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/removido.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BODY.to_vec(), "application/pdf"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = downloader(3)
        .download(&format!("{}/removido.pdf", server.uri()), dir.path())
        .await;

    assert!(matches!(outcome, DownloadOutcome::Failed { .. }));
}

#[tokio::test]
async fn test_html_served_for_extensionless_url_is_rejected() {
    let server = MockServer::start().await;
    mount_head_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Login</body></html>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = downloader(3)
        .download(&format!("{}/download", server.uri()), dir.path())
        .await;

    assert!(matches!(outcome, DownloadOutcome::Failed { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_content_disposition_names_the_file() {
    let server = MockServer::start().await;
    mount_head_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/arquivo"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(PDF_BODY.to_vec(), "application/pdf")
                .insert_header(
                    "content-disposition",
                    "attachment; filename=\"balanco-2023.pdf\"",
                ),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = downloader(3)
        .download(&format!("{}/arquivo", server.uri()), dir.path())
        .await;

    assert_eq!(
        outcome.local_path(),
        Some(dir.path().join("balanco-2023.pdf").as_path())
    );
    assert_eq!(outcome.file_type(), "pdf");
}

/// Serves HEAD normally, then answers GET with `sent` of `declared` bytes and stalls
async fn stalling_server(declared: usize, sent: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                if request.starts_with(b"HEAD") {
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                        )
                        .await;
                    return;
                }

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    declared
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(sent).await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_stalled_body_keeps_partial_file() {
    let base = stalling_server(10_000, b"%PDF-1.4 partial").await;

    let settings = DownloadSettings {
        chunk_timeout: Duration::from_millis(300),
        ..fast_settings(3)
    };
    let dir = TempDir::new().unwrap();
    let outcome = Downloader::new(Client::new(), settings, 4)
        .download(&format!("{}/parcial.pdf", base), dir.path())
        .await;

    match outcome {
        DownloadOutcome::Downloaded { path, bytes, .. } => {
            assert_eq!(path, dir.path().join("parcial.pdf"));
            assert_eq!(bytes, 16);
            assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 partial");
        }
        other => panic!("expected a partial download, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_body_is_removed_and_retried() {
    let server = MockServer::start().await;
    mount_head_ok(&server).await;

    Mock::given(method("GET"))
        .and(path("/vazio.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::new(), "application/pdf"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vazio.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BODY.to_vec(), "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = downloader(3)
        .download(&format!("{}/vazio.pdf", server.uri()), dir.path())
        .await;

    assert_eq!(
        outcome.local_path(),
        Some(dir.path().join("vazio.pdf").as_path())
    );
    assert_eq!(std::fs::read(dir.path().join("vazio.pdf")).unwrap(), PDF_BODY);
}

#[tokio::test]
async fn test_always_empty_body_leaves_no_file() {
    let server = MockServer::start().await;
    mount_head_ok(&server).await;
    Mock::given(method("GET"))
        .and(path("/nada.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::new(), "application/pdf"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = downloader(2)
        .download(&format!("{}/nada.pdf", server.uri()), dir.path())
        .await;

    assert_eq!(
        outcome,
        DownloadOutcome::Failed {
            reason: "empty response body".to_string()
        }
    );
    assert!(!dir.path().join("nada.pdf").exists());
}
