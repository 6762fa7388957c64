//! Request handling exercised in-process through the router.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use roost::Settings;
use roost::config::{CacheBackend, RunMode};
use roost::server;
use tempfile::TempDir;
use tower::ServiceExt;

fn write(home: &Path, rel: &str, contents: &str) {
    let path = home.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn settings_for(home: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.home = home.to_path_buf();
    settings.cache.backend = CacheBackend::Memory;
    settings
}

fn app(home: &Path) -> Router {
    server::build_app(Arc::new(settings_for(home))).unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8_lossy(&bytes).into_owned())
}

fn location(headers: &axum::http::HeaderMap) -> &str {
    headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_component_config_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "components/foo/foo.config.json", r#"{"title":"Foo"}"#);
    let app = app(temp_dir.path());

    let (status, headers, body) = get(&app, "/foo/config/objects.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"title":"Foo"}"#);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
}

#[tokio::test]
async fn test_subcomponent_without_config_returns_empty_object() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("components/foo/bar")).unwrap();
    let app = app(temp_dir.path());

    let (status, _, body) = get(&app, "/foo/bar/config/objects.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "{}");
}

#[tokio::test]
async fn test_missing_subcomponent_falls_through_to_entrypoint() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "components/foo/foo.view.html", "<h1>Foo</h1>");
    let app = app(temp_dir.path());

    let (status, headers, _) = get(&app, "/foo/missing").await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/index");
}

#[tokio::test]
async fn test_component_view_renders_config_and_request_data() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "components/foo/foo.config.json", r#"{"title":"Foo"}"#);
    write(
        temp_dir.path(),
        "components/foo/foo.view.html",
        "<h1>{{ title }}</h1><p>{{ params.component }} {{ query.q }}</p>",
    );
    let app = app(temp_dir.path());

    let (status, headers, body) = get(&app, "/foo?q=shoes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>Foo</h1><p>foo shoes</p>");
    assert!(
        headers
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
}

#[tokio::test]
async fn test_subcomponent_view_uses_fallback_config() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "components/nav/header/nav.header.config.json",
        r#"{"logo":"logo.png"}"#,
    );
    write(
        temp_dir.path(),
        "components/nav/header/header.view.html",
        "<img src=\"{{ logo }}\"> {{ params.subcomponent }}",
    );
    let app = app(temp_dir.path());

    let (status, _, body) = get(&app, "/nav/header").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<img src=\"logo.png\"> header");
}

#[tokio::test]
async fn test_missing_views() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("components/foo/bar")).unwrap();
    let app = app(temp_dir.path());

    // Top-level component without a view redirects
    let (status, headers, _) = get(&app, "/foo").await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/index");

    // Existing subcomponent without a view is a 404
    let (status, _, _) = get(&app, "/foo/bar").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The entrypoint itself never redirects to itself
    let (status, _, _) = get(&app, "/index").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catch_all_redirects_to_configured_entrypoint() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = settings_for(temp_dir.path());
    settings.server.entrypoint = "home".to_string();
    let app = server::build_app(Arc::new(settings)).unwrap();

    for uri in ["/", "/a/b/c", "/a/b/c/d/e"] {
        let (status, headers, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::FOUND, "{uri}");
        assert_eq!(location(&headers), "/home", "{uri}");
    }
}

#[tokio::test]
async fn test_invalid_segments_never_reach_the_filesystem() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "components/secret.config.json", r#"{"k":"v"}"#);
    let app = app(temp_dir.path());

    let (status, _, _) = get(&app, "/%2E%2E/config/objects.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = get(&app, "/foo/%2E%2E/config/objects.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, headers, _) = get(&app, "/foo/%2E%2E").await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/index");
}

#[tokio::test]
async fn test_broken_template_is_a_server_error() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "components/foo/foo.view.html", "{% for %}");
    let app = app(temp_dir.path());

    let (status, _, _) = get(&app, "/foo").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_static_files_take_precedence() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "static/robots.txt", "User-agent: *\n");
    write(temp_dir.path(), "static/css/site.css", "body{}");
    write(temp_dir.path(), "components/robots.txt/robots.txt.view.html", "shadowed");
    write(temp_dir.path(), "assets/app.js", "console.log(1)");
    let app = app(temp_dir.path());

    let (status, _, body) = get(&app, "/robots.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "User-agent: *\n");

    let (status, _, body) = get(&app, "/css/site.css").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "body{}");

    let (status, _, body) = get(&app, "/assets/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "console.log(1)");
}

#[tokio::test]
async fn test_service_manifest_is_mounted() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "components/shop/cart.service.json",
        r#"{"routes":[
            {"path":"/status","body":{"ok":true}},
            {"path":"/terms","file":"terms.txt","content_type":"text/plain"}
        ]}"#,
    );
    write(temp_dir.path(), "components/shop/terms.txt", "Be nice.");
    let app = app(temp_dir.path());

    let (status, headers, body) = get(&app, "/shop/cart/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true}"#);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");

    let (status, _, body) = get(&app, "/shop/cart/terms").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Be nice.");
}

#[tokio::test]
async fn test_service_leaves_component_routes_reachable() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "components/shop/shop.config.json", r#"{"title":"Shop"}"#);
    write(temp_dir.path(), "components/shop/shop.view.html", "<h1>{{ title }}</h1>");
    write(
        temp_dir.path(),
        "components/shop/cart/cart.view.html",
        "cart {{ params.subcomponent }}",
    );
    write(
        temp_dir.path(),
        "components/shop/shop.service.json",
        r#"{"routes":[{"path":"/status","body":{"ok":true}}]}"#,
    );
    let app = app(temp_dir.path());

    let (status, _, body) = get(&app, "/shop/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true}"#);

    let (status, _, body) = get(&app, "/shop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>Shop</h1>");

    let (status, _, body) = get(&app, "/shop/config/objects.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"title":"Shop"}"#);

    let (status, _, body) = get(&app, "/shop/cart").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "cart cart");

    let (status, headers, _) = get(&app, "/shop/nosuch").await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/index");
}

#[tokio::test]
async fn test_missing_asset_falls_through_to_entrypoint() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "assets/app.js", "console.log(1)");
    let app = app(temp_dir.path());

    let (status, headers, _) = get(&app, "/assets/missing.js").await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/index");

    let (status, _, _) = get(&app, "/assets/app.js").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_production_mode_compresses() {
    let temp_dir = TempDir::new().unwrap();
    let long_title = "x".repeat(2048);
    write(
        temp_dir.path(),
        "components/foo/foo.config.json",
        &format!(r#"{{"title":"{long_title}"}}"#),
    );
    let mut settings = settings_for(temp_dir.path());
    settings.mode = RunMode::Production;
    let app = server::build_app(Arc::new(settings)).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/foo/config/objects.json")
                .header(header::ACCEPT_ENCODING, "gzip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
}
