//! Integration tests for the binder
//!
//! These tests use wiremock to serve a small chapter-per-page book and run
//! the full pipeline end-to-end into a temporary output directory.

use chapter_binder::book::{merge, rewrite, BookDocument};
use chapter_binder::config::{Config, FetcherConfig};
use chapter_binder::crawler::{ChapterWalker, Coordinator, PageFetcher, PageRules};
use chapter_binder::resources::ResourceMap;
use chapter_binder::{BinderError, Stage};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `output_dir`
fn create_test_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.fetcher = FetcherConfig {
        max_retries: 1,
        backoff_base_ms: 1,
        ..FetcherConfig::default()
    };
    config.output.directory = output_dir.display().to_string();
    config
}

fn chapter_html(number: usize, next: Option<&str>, extra: &str) -> String {
    let next_link = next
        .map(|n| format!(r#"<a href="{}">weiter &gt;&gt;</a>"#, n))
        .unwrap_or_default();
    format!(
        r#"<html>
<head>
  <title>Der Bote - Kapitel {number}</title>
  <meta name="author" content="Anna Beispiel">
  <link rel="stylesheet" href="/css/book.css">
</head>
<body>
  <div class="topnavi-gb"><a href="/index.html">Inhalt</a>{next_link}</div>
  <h3 class="title">Der Bote</h3>
  <h2>Kapitel {number}</h2>
  <img src="../img/logo.png" alt="logo">
  <p id="text">Text of chapter {number}.</p>
  {extra}
  <div class="bottomnavi-gb">{next_link}</div>
</body>
</html>"#
    )
}

async fn mount_page(server: &MockServer, p: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_asset(server: &MockServer, p: &str, body: &[u8], expected: u64) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(expected)
        .mount(server)
        .await;
}

/// Mounts the three chapters of a book
async fn mount_chapters(server: &MockServer) {
    mount_page(
        server,
        "/book/chap01.html",
        chapter_html(1, Some("chap02.html"), r#"<p><a href="chap03.html#text">see the end</a></p>"#),
    )
    .await;
    mount_page(server, "/book/chap02.html", chapter_html(2, Some("chap03.html"), "")).await;
    mount_page(server, "/book/chap03.html", chapter_html(3, None, "")).await;
}

/// Mounts a three chapter book sharing one logo and one stylesheet
async fn mount_book(server: &MockServer) {
    mount_chapters(server).await;
    mount_asset(server, "/img/logo.png", b"\x89PNG logo", 1).await;
    mount_asset(server, "/css/book.css", b"body { margin: 2em }", 1).await;
}

#[tokio::test]
async fn test_three_chapter_book_with_shared_logo() {
    let server = MockServer::start().await;
    mount_book(&server).await;
    let out = TempDir::new().unwrap();

    let report = Coordinator::new(create_test_config(out.path()))
        .unwrap()
        .run(&format!("{}/book/chap01.html", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.title, "Der Bote");
    assert_eq!(report.author.as_deref(), Some("Anna Beispiel"));
    assert_eq!(report.chapter_count(), 3);
    assert_eq!(report.resources_cached, 2);
    assert!(report.remote_fallbacks.is_empty());
    assert_eq!(report.html_path, out.path().join("Der_Bote.html"));

    // Exactly one copy of the shared image
    let mut files: Vec<String> = fs::read_dir(&report.resource_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, vec!["book.css", "logo.png"]);
    assert_eq!(
        fs::read(report.resource_dir.join("logo.png")).unwrap(),
        b"\x89PNG logo"
    );

    let html = fs::read_to_string(&report.html_path).unwrap();

    // Chapters in order
    let one = html.find("Text of chapter 1.").unwrap();
    let two = html.find("Text of chapter 2.").unwrap();
    let three = html.find("Text of chapter 3.").unwrap();
    assert!(one < two && two < three);
    assert_eq!(html.matches(r#"class="chapter-anchor""#).count(), 3);

    // All references local
    assert_eq!(html.matches(r#"src="Der_Bote_files/logo.png""#).count(), 3);
    assert!(html.contains(r#"href="Der_Bote_files/book.css""#));
    assert!(!html.contains(&server.uri()));

    // Navigation stripped, duplicate ids renamed, cross-chapter link local
    assert!(!html.contains("weiter"));
    assert!(html.contains(r#"id="chapter-002-text""#));
    assert!(html.contains(r##"href="#chapter-003-text""##));
    assert!(html.contains(r#"<h2 class="chapter">Kapitel 1</h2>"#));
}

#[tokio::test]
async fn test_broken_image_keeps_remote_url() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/book/chap01.html",
        chapter_html(1, None, r#"<img src="/img/broken.png">"#),
    )
    .await;
    mount_asset(&server, "/img/logo.png", b"logo", 1).await;
    mount_asset(&server, "/css/book.css", b"css", 1).await;
    Mock::given(method("GET"))
        .and(path("/img/broken.png"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    let out = TempDir::new().unwrap();

    let report = Coordinator::new(create_test_config(out.path()))
        .unwrap()
        .run(&format!("{}/book/chap01.html", server.uri()))
        .await
        .unwrap();

    let broken = format!("{}/img/broken.png", server.uri());
    assert_eq!(report.remote_fallbacks, vec![broken.clone()]);
    assert_eq!(report.resources_cached, 2);

    let html = fs::read_to_string(&report.html_path).unwrap();
    assert!(html.contains(&format!(r#"src="{}""#, broken)));
    assert!(html.contains(r#"src="Der_Bote_files/logo.png""#));
}

#[tokio::test]
async fn test_start_at_last_page() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/chap03.html", chapter_html(3, None, "")).await;
    mount_asset(&server, "/img/logo.png", b"logo", 1).await;
    mount_asset(&server, "/css/book.css", b"css", 1).await;
    let out = TempDir::new().unwrap();

    let report = Coordinator::new(create_test_config(out.path()))
        .unwrap()
        .run(&format!("{}/book/chap03.html", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.chapter_count(), 1);
    let html = fs::read_to_string(&report.html_path).unwrap();
    assert!(html.contains("Text of chapter 3."));
    assert!(html.contains(r#"<a id="chapter-001" class="chapter-anchor"></a>"#));
}

#[tokio::test]
async fn test_back_link_ends_traversal() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/chap01.html", chapter_html(1, Some("chap02.html"), "")).await;
    // Chapter 2 links "next" back to chapter 1; it must not be fetched again
    mount_page(&server, "/book/chap02.html", chapter_html(2, Some("chap01.html"), "")).await;
    mount_asset(&server, "/img/logo.png", b"logo", 1).await;
    mount_asset(&server, "/css/book.css", b"css", 1).await;
    let out = TempDir::new().unwrap();

    let report = Coordinator::new(create_test_config(out.path()))
        .unwrap()
        .run(&format!("{}/book/chap01.html", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.chapter_count(), 2);
}

#[tokio::test]
async fn test_redirect_back_to_first_chapter_ends_traversal() {
    let server = MockServer::start().await;
    // Fetched once directly and once more through the redirect
    Mock::given(method("GET"))
        .and(path("/book/chap01.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(chapter_html(1, Some("chap02.html"), ""), "text/html"),
        )
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/book/chap02.html", chapter_html(2, Some("chap03.html"), "")).await;
    Mock::given(method("GET"))
        .and(path("/book/chap03.html"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/book/chap01.html"))
        .expect(1)
        .mount(&server)
        .await;
    mount_asset(&server, "/img/logo.png", b"logo", 1).await;
    mount_asset(&server, "/css/book.css", b"css", 1).await;
    let out = TempDir::new().unwrap();

    let report = Coordinator::new(create_test_config(out.path()))
        .unwrap()
        .run(&format!("{}/book/chap01.html", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.chapter_count(), 2);
    assert!(report.chapter_urls[1].ends_with("/book/chap02.html"));
    let html = fs::read_to_string(&report.html_path).unwrap();
    assert_eq!(html.matches("Text of chapter 1.").count(), 1);
}

#[tokio::test]
async fn test_unusable_output_dir_abandons_downloads() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/chap01.html", chapter_html(1, None, "")).await;
    for asset in ["/img/logo.png", "/css/book.css"] {
        Mock::given(method("GET"))
            .and(path(asset))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"slow".to_vec())
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;
    }
    let out = TempDir::new().unwrap();
    let blocker = out.path().join("not-a-dir");
    fs::write(&blocker, b"keep").unwrap();

    let started = Instant::now();
    let result = Coordinator::new(create_test_config(&blocker))
        .unwrap()
        .run(&format!("{}/book/chap01.html", server.uri()))
        .await;

    match result {
        Err(BinderError::Stage { stage, .. }) => assert_eq!(stage, Stage::Output),
        other => panic!("expected output failure, got {:?}", other.map(|r| r.title)),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(fs::read(&blocker).unwrap(), b"keep");
    let entries: Vec<_> = fs::read_dir(out.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_rewrite_twice_is_noop() {
    let server = MockServer::start().await;
    mount_chapters(&server).await;

    let config = create_test_config(Path::new("."));
    let fetcher = PageFetcher::new(&config.fetcher).unwrap();
    let rules = PageRules::from_config(&config.walker).unwrap();
    let start = url::Url::parse(&format!("{}/book/chap01.html", server.uri())).unwrap();

    let chapters = ChapterWalker::new(start, fetcher, rules, &config.walker)
        .walk_all()
        .await
        .unwrap();
    let mut merged = merge(BookDocument::new(chapters).unwrap()).unwrap();

    let mut resources = ResourceMap::new();
    resources.insert(
        format!("{}/img/logo.png", server.uri()),
        "Der_Bote_files/logo.png".to_string(),
    );

    let first = rewrite(&mut merged, &resources);
    let rendered = merged.render();
    let second = rewrite(&mut merged, &resources);

    assert!(first > 0);
    assert_eq!(second, 0);
    assert_eq!(merged.render(), rendered);
}

#[tokio::test]
async fn test_failed_walk_writes_nothing() {
    let server = MockServer::start().await;
    mount_page(&server, "/book/chap01.html", chapter_html(1, Some("chap02.html"), "")).await;
    Mock::given(method("GET"))
        .and(path("/book/chap02.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let out = TempDir::new().unwrap();

    let result = Coordinator::new(create_test_config(out.path()))
        .unwrap()
        .run(&format!("{}/book/chap01.html", server.uri()))
        .await;

    match result {
        Err(BinderError::Stage { stage, .. }) => assert_eq!(stage, Stage::Walk),
        other => panic!("expected walk failure, got {:?}", other.map(|r| r.title)),
    }
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}
