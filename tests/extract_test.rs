use axum::{
    Json, Router,
    extract::Query,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use proclink::extract::{
    Extractor, HttpConfig, IpPolicy, OembedExtractor, ProviderRegistry,
};

const ARTICLE: &str = r#"<!doctype html>
<html><head>
  <title>Fallback title</title>
  <meta property="og:title" content="An article">
  <meta property="og:description" content="Something worth reading">
  <meta property="og:image" content="/img/cover.png">
  <meta property="og:site_name" content="Test Site">
</head><body><p>Hello</p></body></html>"#;

const WITH_DISCOVERY: &str = r#"<html><head>
  <title>Video page</title>
  <link rel="alternate" type="application/json+oembed" href="/oembed.json?id=7">
</head></html>"#;

const BROKEN_DISCOVERY: &str = r#"<html><head>
  <title>Still a page</title>
  <link rel="alternate" type="application/json+oembed" href="/nowhere.json">
</head></html>"#;

async fn provider_endpoint(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    if params.get("format").map(String::as_str) != Some("json") {
        return StatusCode::NOT_IMPLEMENTED.into_response();
    }
    let Some(url) = params.get("url") else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    Json(json!({
        "type": "video",
        "version": "1.0",
        "title": format!("Video at {url}"),
        "width": "640",
        "height": 360,
        "html": "<iframe></iframe>"
    }))
    .into_response()
}

fn site() -> Router {
    Router::new()
        .route("/article", get(|| async { Html(ARTICLE) }))
        .route("/video", get(|| async { Html(WITH_DISCOVERY) }))
        .route("/broken", get(|| async { Html(BROKEN_DISCOVERY) }))
        .route(
            "/oembed.json",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/json+oembed")],
                    r#"{"type":"rich","version":"1.0","title":"Discovered","provider_name":"Discovery"}"#,
                )
            }),
        )
        .route("/api/oembed.json", get(provider_endpoint))
        .route(
            "/logo.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0x89u8, b'P', b'N', b'G']) }),
        )
        .route(
            "/archive.bin",
            get(|| async { ([(header::CONTENT_TYPE, "application/octet-stream")], vec![0u8; 16]) }),
        )
        .route(
            "/long",
            get(|| async {
                let padding = " ".repeat(4096);
                Html(format!(
                    "<html><head><title>Early</title>{padding}<meta property=\"og:title\" content=\"Late\"></head></html>"
                ))
            }),
        )
        .route("/gone", get(|| async { (StatusCode::GONE, "gone") }))
        .route("/hop", get(|| async { Redirect::temporary("http://10.255.255.1/") }))
        .route("/moved", get(|| async { Redirect::permanent("/article") }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Html(ARTICLE)
            }),
        )
}

/// Serve the test site on an ephemeral local port
async fn spawn_site() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, site()).await.unwrap();
    });
    addr
}

fn extractor(config: HttpConfig, providers: ProviderRegistry) -> OembedExtractor {
    OembedExtractor::new(config, Arc::new(providers)).unwrap()
}

fn plain_extractor() -> OembedExtractor {
    extractor(HttpConfig::default(), ProviderRegistry::default())
}

#[tokio::test]
async fn test_page_metadata_from_opengraph() {
    let addr = spawn_site().await;

    let info = plain_extractor()
        .extract(&format!("http://{addr}/article"))
        .await
        .expect("page metadata");

    assert_eq!(info.status, 200);
    assert_eq!(info.kind, "link");
    assert_eq!(info.title.as_deref(), Some("An article"));
    assert_eq!(info.description.as_deref(), Some("Something worth reading"));
    assert_eq!(info.provider_name.as_deref(), Some("Test Site"));
    assert_eq!(info.provider_url, Some(format!("http://{addr}")));
    assert_eq!(info.thumbnail_url, Some(format!("http://{addr}/img/cover.png")));
}

#[tokio::test]
async fn test_redirect_within_policy_is_followed() {
    let addr = spawn_site().await;

    let info = plain_extractor()
        .extract(&format!("http://{addr}/moved"))
        .await
        .expect("page metadata");

    assert_eq!(info.title.as_deref(), Some("An article"));
    assert_eq!(info.url, Some(format!("http://{addr}/article")));
}

#[tokio::test]
async fn test_discovery_link_is_preferred() {
    let addr = spawn_site().await;

    let info = plain_extractor()
        .extract(&format!("http://{addr}/video"))
        .await
        .expect("discovered metadata");

    assert_eq!(info.status, 200);
    assert_eq!(info.kind, "rich");
    assert_eq!(info.title.as_deref(), Some("Discovered"));
    assert_eq!(info.provider_name.as_deref(), Some("Discovery"));
}

#[tokio::test]
async fn test_broken_discovery_falls_back_to_page() {
    let addr = spawn_site().await;

    let info = plain_extractor()
        .extract(&format!("http://{addr}/broken"))
        .await
        .expect("page metadata");

    assert_eq!(info.kind, "link");
    assert_eq!(info.title.as_deref(), Some("Still a page"));
}

#[tokio::test]
async fn test_registered_provider_is_used() {
    let addr = spawn_site().await;
    let providers = json!([{
        "provider_name": "Local Video",
        "provider_url": format!("http://{addr}/"),
        "endpoints": [{
            "schemes": [format!("http://{addr}/watch/*")],
            "url": format!("http://{addr}/api/oembed.{{format}}")
        }]
    }]);
    let providers = ProviderRegistry::from_json(providers.to_string().as_bytes()).unwrap();

    let target = format!("http://{addr}/watch/abc");
    let info = extractor(HttpConfig::default(), providers)
        .extract(&target)
        .await
        .expect("provider metadata");

    assert_eq!(info.status, 200);
    assert_eq!(info.kind, "video");
    assert_eq!(info.title, Some(format!("Video at {target}")));
    assert_eq!(info.width, Some(640));
    assert_eq!(info.height, Some(360));
    assert_eq!(info.provider_name.as_deref(), Some("Local Video"));
    assert_eq!(info.provider_url, Some(format!("http://{addr}/")));
}

#[tokio::test]
async fn test_image_and_binary_content() {
    let addr = spawn_site().await;
    let extractor = plain_extractor();

    let image = extractor
        .extract(&format!("http://{addr}/logo.png"))
        .await
        .expect("photo metadata");
    assert_eq!(image.kind, "photo");
    assert_eq!(image.url, Some(format!("http://{addr}/logo.png")));

    let binary = extractor
        .extract(&format!("http://{addr}/archive.bin"))
        .await
        .expect("link metadata");
    assert_eq!(binary.kind, "link");
    assert!(binary.title.is_none());
}

#[tokio::test]
async fn test_html_is_read_up_to_the_byte_cap() {
    let addr = spawn_site().await;
    let config = HttpConfig {
        max_html_bytes: 512,
        ..Default::default()
    };

    let info = extractor(config, ProviderRegistry::default())
        .extract(&format!("http://{addr}/long"))
        .await
        .expect("page metadata");

    assert_eq!(info.title.as_deref(), Some("Early"));
}

#[tokio::test]
async fn test_upstream_status_is_reported() {
    let addr = spawn_site().await;

    let info = plain_extractor()
        .extract(&format!("http://{addr}/gone"))
        .await
        .expect("status-only metadata");

    assert_eq!(info.status, 410);
}

#[tokio::test]
async fn test_denied_addresses_are_never_contacted() {
    let addr = spawn_site().await;
    let config = HttpConfig {
        policy: IpPolicy::from_ranges("", "127.0.0.0/8 ::1/128").unwrap(),
        ..Default::default()
    };
    let extractor = extractor(config, ProviderRegistry::default());

    // Literal address
    assert!(extractor.extract(&format!("http://{addr}/article")).await.is_none());
    // Hostname resolving into the denied range
    let by_name = format!("http://localhost:{}/article", addr.port());
    assert!(extractor.extract(&by_name).await.is_none());
}

#[tokio::test]
async fn test_allow_list_excludes_everything_else() {
    let addr = spawn_site().await;
    let config = HttpConfig {
        policy: IpPolicy::from_ranges("192.0.2.0/24", "").unwrap(),
        ..Default::default()
    };

    let info = extractor(config, ProviderRegistry::default())
        .extract(&format!("http://{addr}/article"))
        .await;
    assert!(info.is_none());
}

#[tokio::test]
async fn test_redirect_into_denied_range_is_refused() {
    let addr = spawn_site().await;
    let config = HttpConfig {
        policy: IpPolicy::from_ranges("", "10.0.0.0/8").unwrap(),
        ..Default::default()
    };

    let info = extractor(config, ProviderRegistry::default())
        .extract(&format!("http://{addr}/hop"))
        .await;
    assert!(info.is_none());
}

#[tokio::test]
async fn test_wait_timeout_bounds_the_request() {
    let addr = spawn_site().await;
    let config = HttpConfig {
        wait_timeout: Duration::from_millis(500),
        ..Default::default()
    };

    let started = tokio::time::Instant::now();
    let info = extractor(config, ProviderRegistry::default())
        .extract(&format!("http://{addr}/slow"))
        .await;

    assert!(info.is_none());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_unusable_urls_yield_nothing() {
    let extractor = plain_extractor();

    assert!(extractor.extract("not a url").await.is_none());
    assert!(extractor.extract("ftp://example.com/file").await.is_none());
}

#[test]
fn test_bundled_providers_file() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("providers.json");
    let providers = ProviderRegistry::load(&path).unwrap();

    // The discovery-only entry has no schemes
    assert_eq!(providers.len(), 4);

    let youtube = providers
        .find("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        .expect("youtube provider");
    assert_eq!(youtube.name, "YouTube");
    assert_eq!(
        youtube.endpoint_for("https://youtu.be/x").unwrap().as_str(),
        "https://www.youtube.com/oembed?url=https%3A%2F%2Fyoutu.be%2Fx&format=json"
    );

    let vimeo = providers.find("https://vimeo.com/76979871").expect("vimeo provider");
    assert_eq!(
        vimeo.endpoint_for("https://vimeo.com/76979871").unwrap().path(),
        "/api/oembed.json"
    );

    assert!(providers.find("https://example.com/").is_none());
}
