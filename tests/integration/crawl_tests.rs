//! Integration tests for company runs
//!
//! These tests use wiremock to create a small company site and run the full
//! crawl, download, and persistence cycle against a temporary database.

use company_crawler::config::{builtin_targets, CrawlTarget, DatabaseSettings, DownloadSettings};
use company_crawler::storage::{open_storage, RunStatus, Storage};
use company_crawler::{run_company, RunOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF_BODY: &[u8] = b"%PDF-1.4 annual report";

fn test_target(server: &MockServer) -> CrawlTarget {
    let mut target = builtin_targets().remove(0);
    target.url = format!("{}/", server.uri());
    target.excluded_tags.clear();
    target.excluded_selector.clear();
    target
}

fn test_options(root: &Path, force: bool) -> RunOptions {
    RunOptions {
        force,
        output_dir: root.join("output"),
        cache_dir: root.join("cache"),
        download: DownloadSettings {
            timeout: Duration::from_secs(5),
            chunk_timeout: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(2),
            backoff_unit: Duration::from_millis(10),
            ..Default::default()
        },
        batch_pause: Duration::from_millis(10),
        page_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn test_db(root: &Path) -> DatabaseSettings {
    DatabaseSettings {
        path: root.join("crawler.db"),
    }
}

async fn mount_page(server: &MockServer, route: &str, html: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts `/`, `/about` and `/contact`, all linking to `/report.pdf`
///
/// Pages other than the seed are expected `page_fetches` times; the PDF body is
/// expected exactly once.
async fn mount_company_site(server: &MockServer, seed_fetches: u64, page_fetches: u64) {
    mount_page(
        server,
        "/",
        r#"<html><head><title>Home</title></head><body>
            <a href="/about">About</a>
            <a href="/contact">Contact</a>
            <a href="/report.pdf">Annual report</a>
            <img src="/logo.png" alt="Logo">
        </body></html>"#,
        seed_fetches,
    )
    .await;
    mount_page(
        server,
        "/about",
        r#"<html><head><title>About</title></head><body>
            <p>About us</p><a href="/">Home</a><a href="/report.pdf">Report</a>
        </body></html>"#,
        page_fetches,
    )
    .await;
    mount_page(
        server,
        "/contact",
        r#"<html><head><title>Contact</title></head><body><p>Write to us</p></body></html>"#,
        page_fetches,
    )
    .await;

    Mock::given(method("HEAD"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BODY.to_vec(), "application/pdf"))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_three_pages_and_one_document() {
    let server = MockServer::start().await;
    mount_company_site(&server, 1, 1).await;

    let dir = TempDir::new().unwrap();
    let target = test_target(&server);
    let db = test_db(dir.path());

    let summary = run_company(&target, &test_options(dir.path(), false), &db)
        .await
        .expect("run should succeed");

    assert_eq!(summary.pages_crawled, 3);
    assert_eq!(summary.pages_new, 3);
    assert_eq!(summary.documents_queued, 1);
    assert_eq!(summary.documents_downloaded, 1);
    assert_eq!(summary.failures(), 0);

    let storage = open_storage(&db.path).unwrap();
    assert_eq!(storage.count_records(&target.table).unwrap(), 4);

    let about = storage
        .get_record(&target.table, &format!("{}/about", server.uri()))
        .unwrap()
        .expect("about page stored");
    assert_eq!(about.tags, vec!["about"]);
    let content = about.content.unwrap();
    assert!(content.starts_with("# About\n\nAbout us"));
    assert!(about.local_path.is_some());

    let home = storage
        .get_record(&target.table, &format!("{}/", server.uri()))
        .unwrap()
        .expect("seed stored");
    assert_eq!(home.images, vec![format!("{}/logo.png", server.uri())]);

    let report = storage
        .get_record(&target.table, &format!("{}/report.pdf", server.uri()))
        .unwrap()
        .expect("document stored");
    assert!(report.tags.contains(&"pdf".to_string()));
    assert!(report.tags.contains(&"document".to_string()));
    let local = report.local_path.expect("document has a local path");
    assert_eq!(std::fs::read(&local).unwrap(), PDF_BODY);
    assert!(report.parent_document.is_none());

    let runs = storage.recent_runs(Some(&target.key), 5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].summary.as_ref().map(|s| s.pages_new), Some(3));

    assert!(dir.path().join("cache/imbel_crawled_urls.txt").exists());
    assert!(dir.path().join("cache/imbel_document_urls.txt").exists());
}

#[tokio::test]
async fn test_second_run_skips_known_urls() {
    let server = MockServer::start().await;
    // The seed is fetched on every run; everything else only once
    mount_company_site(&server, 2, 1).await;

    let dir = TempDir::new().unwrap();
    let target = test_target(&server);
    let db = test_db(dir.path());
    let options = test_options(dir.path(), false);

    run_company(&target, &options, &db).await.unwrap();
    let second = run_company(&target, &options, &db).await.unwrap();

    assert_eq!(second.pages_crawled, 1);
    assert_eq!(second.pages_new, 0);
    assert_eq!(second.pages_skipped, 1);
    assert_eq!(second.documents_queued, 0);
    assert_eq!(second.documents_downloaded, 0);

    let storage = open_storage(&db.path).unwrap();
    assert_eq!(storage.count_records(&target.table).unwrap(), 4);
    assert_eq!(storage.recent_runs(Some(&target.key), 5).unwrap().len(), 2);
}

#[tokio::test]
async fn test_forced_run_reprocesses_everything() {
    let server = MockServer::start().await;
    // The document is not fetched again: its file is already on disk
    mount_company_site(&server, 2, 2).await;

    let dir = TempDir::new().unwrap();
    let target = test_target(&server);
    let db = test_db(dir.path());

    run_company(&target, &test_options(dir.path(), false), &db)
        .await
        .unwrap();
    let forced = run_company(&target, &test_options(dir.path(), true), &db)
        .await
        .unwrap();

    assert_eq!(forced.pages_crawled, 3);
    assert_eq!(forced.pages_updated, 3);
    assert_eq!(forced.pages_new, 0);
    assert_eq!(forced.documents_queued, 1);
    assert_eq!(forced.documents_downloaded, 1);

    let storage = open_storage(&db.path).unwrap();
    assert_eq!(storage.count_records(&target.table).unwrap(), 4);
}

#[tokio::test]
async fn test_zip_document_is_expanded() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body><a href="/editais/anexos.zip">Anexos</a></body></html>"#,
        1,
    )
    .await;

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("edital.pdf", options).unwrap();
        zip.write_all(PDF_BODY).unwrap();
        zip.start_file("planilhas/itens.csv", options).unwrap();
        zip.write_all(b"item;valor\n1;10\n").unwrap();
        zip.start_file("vazio.txt", options).unwrap();
        zip.finish().unwrap();
    }

    Mock::given(method("HEAD"))
        .and(path("/editais/anexos.zip"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/editais/anexos.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(cursor.into_inner(), "application/zip"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let target = test_target(&server);
    let db = test_db(dir.path());

    let summary = run_company(&target, &test_options(dir.path(), false), &db)
        .await
        .unwrap();

    assert_eq!(summary.documents_downloaded, 1);
    assert_eq!(summary.files_extracted, 2);

    let storage = open_storage(&db.path).unwrap();
    assert_eq!(storage.count_extracted(&target.table).unwrap(), 2);
    // seed page, the archive and its two non-empty entries
    assert_eq!(storage.count_records(&target.table).unwrap(), 4);

    let archive = storage
        .get_record(&target.table, &format!("{}/editais/anexos.zip", server.uri()))
        .unwrap()
        .expect("archive stored");
    assert!(archive.tags.contains(&"zip".to_string()));
    assert!(archive.tags.contains(&"editais".to_string()));
}

#[tokio::test]
async fn test_failed_seed_is_counted_not_fatal() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let target = test_target(&server);
    let db = test_db(dir.path());

    let summary = run_company(&target, &test_options(dir.path(), false), &db)
        .await
        .unwrap();

    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.pages_new, 0);

    let storage = open_storage(&db.path).unwrap();
    assert_eq!(storage.count_records(&target.table).unwrap(), 0);
}

#[tokio::test]
async fn test_batch_timeout_fails_slow_download_and_keeps_earlier_batch() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<html><body>
            <a href="/rapido.pdf">Fast</a>
            <a href="/lento.pdf">Slow</a>
        </body></html>"#,
        1,
    )
    .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rapido.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PDF_BODY.to_vec(), "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lento.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(PDF_BODY.to_vec(), "application/pdf")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let target = test_target(&server);
    let db = test_db(dir.path());
    let mut options = test_options(dir.path(), false);
    // One document per batch; each batch gets twice the download timeout
    options.batch_size = 1;
    options.download.timeout = Duration::from_millis(500);

    let summary = run_company(&target, &options, &db).await.unwrap();

    assert_eq!(summary.documents_queued, 2);
    assert_eq!(summary.documents_downloaded, 1);
    assert_eq!(summary.documents_failed, 1);

    let storage = open_storage(&db.path).unwrap();
    assert!(storage
        .get_record(&target.table, &format!("{}/rapido.pdf", server.uri()))
        .unwrap()
        .is_some());
    assert!(storage
        .get_record(&target.table, &format!("{}/lento.pdf", server.uri()))
        .unwrap()
        .is_none());
    assert!(!dir.path().join("output/imbel/documents/lento.pdf").exists());
}
