//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive the
//! reqwest-backed engine end-to-end.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use webcrawl::config::{load_config, parse_config, Config};
use webcrawl::crawler::{ReqwestTransport, ResolveOptions};
use webcrawl::robots::fetch_robots;
use webcrawl::{CrawlEngine, Extractor, ExtractorRegistry, FetchError, SiteOptions, Url};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONFIG: &str = r#"
[crawler]
redirect-limit = 5
timeout-secs = 5.0

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"
"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("webcrawl=debug")
        .with_test_writer()
        .try_init();
}

fn test_config() -> Config {
    parse_config(CONFIG).expect("test config is valid")
}

fn engine() -> CrawlEngine {
    init_tracing();
    CrawlEngine::from_config(&test_config(), Arc::new(ExtractorRegistry::with_defaults()))
        .expect("Failed to build engine")
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html")
}

fn page(title: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<li><a href="{}">{}</a></li>"#, href, href))
        .collect();
    html(format!(
        "<html><head><title>{}</title></head><body><h1>{}</h1><ul>{}</ul></body></html>",
        title, title, anchors
    ))
}

async fn mount_page(server: &MockServer, route: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).expect("mock server URL is valid")
}

#[tokio::test]
async fn test_crawl_single_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html(
            r#"<html><head>
                <title>Mock Home</title>
                <meta name="author" content="Test Author">
                <meta name="keywords" content="mock, test">
            </head><body>
                <h1>Welcome</h1>
                <p>This page is served by a mock server.</p>
                <a href="/about">About</a>
                <a href="https://external.example/">Elsewhere</a>
            </body></html>"#,
        ),
        1,
    )
    .await;

    let doc = engine().crawl_url(url(&server, "/")).await.unwrap();

    assert_eq!(doc.title(), Some("Mock Home"));
    assert_eq!(doc.author(), Some("Test Author"));
    assert_eq!(doc.keywords(), vec!["mock", "test"]);
    assert_eq!(
        &doc.text()[..2],
        &["Welcome", "This page is served by a mock server."]
    );
    assert_eq!(
        doc.internal_links().iter().map(Url::as_str).collect::<Vec<_>>(),
        vec!["/about"]
    );
    assert_eq!(
        doc.external_links().iter().map(Url::as_str).collect::<Vec<_>>(),
        vec!["https://external.example/"]
    );
    assert!(doc.url().crawled());
    assert!(doc.url().crawl_duration().is_some());
}

#[tokio::test]
async fn test_user_agent_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(page("Identified", &[]))
        .expect(1)
        .mount(&server)
        .await;

    let doc = engine().crawl_url(url(&server, "/")).await.unwrap();
    assert_eq!(doc.title(), Some("Identified"));
}

#[tokio::test]
async fn test_crawl_site_cyclic() {
    let server = MockServer::start().await;
    mount_page(&server, "/", page("A", &["/b", "/c"]), 1).await;
    mount_page(&server, "/b", page("B", &["/", "https://external.example/page"]), 1).await;
    mount_page(&server, "/c", page("C", &[]), 1).await;

    let mut titles = Vec::new();
    let external = engine()
        .crawl_site(url(&server, "/"), &SiteOptions::default(), |doc| {
            titles.push(doc.title().unwrap_or_default().to_string());
        })
        .await
        .unwrap()
        .expect("seed is reachable");

    assert_eq!(titles, vec!["A", "B", "C"]);
    assert_eq!(
        external.iter().map(Url::as_str).collect::<Vec<_>>(),
        vec!["https://external.example/page"]
    );
}

#[tokio::test]
async fn test_crawl_site_path_filters() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        page("Home", &["/docs/intro", "/docs/private/keys", "/shop"]),
        1,
    )
    .await;
    mount_page(&server, "/docs/intro", page("Intro", &[]), 1).await;
    mount_page(&server, "/docs/private/keys", page("Keys", &[]), 0).await;
    mount_page(&server, "/shop", page("Shop", &[]), 0).await;

    let options = SiteOptions {
        allow_paths: vec!["docs/*".to_string()],
        disallow_paths: vec!["docs/private/*".to_string()],
        ..SiteOptions::default()
    };

    let mut count = 0;
    engine()
        .crawl_site(url(&server, "/"), &options, |_| count += 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_crawl_site_unreachable_seed() {
    let server = MockServer::start().await;
    mount_page(&server, "/", ResponseTemplate::new(500), 1).await;

    let result = engine()
        .crawl_site(url(&server, "/"), &SiteOptions::default(), |_| {})
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_redirect_chain() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/middle"),
        1,
    )
    .await;
    mount_page(
        &server,
        "/middle",
        ResponseTemplate::new(302).insert_header("location", "/new"),
        1,
    )
    .await;
    mount_page(&server, "/new", page("New Home", &[]), 1).await;

    let hops = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&hops);
    let engine = engine().with_redirect_observer(move |_, response, next| {
        log.lock().unwrap().push((response.status, next.is_some()));
    });

    let doc = engine.crawl_url(url(&server, "/old")).await.unwrap();

    assert_eq!(doc.title(), Some("New Home"));
    let redirects = doc.url().redirects();
    assert_eq!(redirects.len(), 2);
    assert_eq!(redirects[0].1, url(&server, "/middle"));
    assert_eq!(doc.url().redirect_target(), Some(&url(&server, "/new")));
    assert_eq!(*hops.lock().unwrap(), vec![(301, true), (302, true), (200, false)]);
}

#[tokio::test]
async fn test_redirect_limit_exceeded() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/loop",
        ResponseTemplate::new(302).insert_header("location", "/loop"),
        3,
    )
    .await;

    let engine = engine().with_resolve_options(ResolveOptions {
        redirect_limit: 2,
        ..ResolveOptions::default()
    });
    let doc = engine.crawl_url(url(&server, "/loop")).await.unwrap();

    assert!(doc.is_empty());
    assert!(doc.url().crawled());
    assert!(matches!(
        doc.fetch_error(),
        Some(FetchError::TooManyRedirects { limit: 2, .. })
    ));
}

#[tokio::test]
async fn test_external_redirect_denied() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/away",
        ResponseTemplate::new(302).insert_header("location", "https://external.example/landing"),
        1,
    )
    .await;

    let engine = engine().with_resolve_options(ResolveOptions {
        follow_external_redirects: false,
        ..ResolveOptions::default()
    });
    let doc = engine.crawl_url(url(&server, "/away")).await.unwrap();

    match doc.fetch_error() {
        Some(FetchError::ExternalRedirectDenied { to, domain, .. }) => {
            assert_eq!(to, "https://external.example/landing");
            assert_eq!(domain, "127.0.0.1");
        }
        other => panic!("unexpected fetch error: {:?}", other),
    }
}

#[tokio::test]
async fn test_not_found_yields_empty_document() {
    let server = MockServer::start().await;
    mount_page(&server, "/missing", ResponseTemplate::new(404), 1).await;

    let doc = engine().crawl_url(url(&server, "/missing")).await.unwrap();
    assert!(doc.is_empty());
    assert!(doc.url().crawled());
    assert!(doc.fetch_error().is_none());
}

#[tokio::test]
async fn test_non_html_yields_empty_document() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/data.json",
        ResponseTemplate::new(200).set_body_raw(r#"{"ok":true}"#, "application/json"),
        1,
    )
    .await;

    let doc = engine().crawl_url(url(&server, "/data.json")).await.unwrap();
    assert!(doc.is_empty());
}

#[tokio::test]
async fn test_connection_failure_yields_empty_document() {
    let target = Url::parse("http://127.0.0.1:1/").unwrap();

    let doc = engine().crawl_url(target).await.unwrap();
    assert!(doc.is_empty());
    assert!(matches!(doc.fetch_error(), Some(FetchError::Network { .. })));
}

#[tokio::test]
async fn test_robots_disallowed_pages_skipped() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_raw("User-agent: *\nDisallow: /private", "text/plain"),
        1,
    )
    .await;
    mount_page(&server, "/", page("Home", &["/public", "/private/data"]), 1).await;
    mount_page(&server, "/public", page("Public", &[]), 1).await;
    mount_page(&server, "/private/data", page("Private", &[]), 0).await;

    let config = test_config();
    let transport = ReqwestTransport::from_config(&config.user_agent).unwrap();
    let rules = fetch_robots(
        &transport,
        &url(&server, "/"),
        &config.user_agent.crawler_name,
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    let engine = CrawlEngine::new(transport, Arc::new(ExtractorRegistry::with_defaults()))
        .with_robots(rules);

    let mut titles = Vec::new();
    engine
        .crawl_site(url(&server, "/"), &SiteOptions::default(), |doc| {
            titles.push(doc.title().unwrap_or_default().to_string());
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(titles, vec!["Home", "Public"]);
}

#[tokio::test]
async fn test_custom_extractor_and_config_file() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/product",
        html(r#"<html><body><span class="price">$19.99</span></body></html>"#),
        1,
    )
    .await;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    file.flush().unwrap();
    let config = load_config(file.path()).unwrap();

    let registry = Arc::new(ExtractorRegistry::with_defaults());
    registry
        .define(Extractor::new("price", "span.price").transform(|value, _, _| {
            let parsed = value
                .as_str()
                .and_then(|s| s.trim_start_matches('$').parse::<f64>().ok());
            Ok(parsed.map(serde_json::Value::from))
        }))
        .unwrap();

    let engine = CrawlEngine::from_config(&config, Arc::clone(&registry)).unwrap();
    let doc = engine.crawl_url(url(&server, "/product")).await.unwrap();
    assert_eq!(doc.get("price"), Some(&serde_json::json!(19.99)));

    let restored = webcrawl::Document::from_stored(doc.to_field_map(), &registry).unwrap();
    assert_eq!(restored.get("price"), doc.get("price"));
}
