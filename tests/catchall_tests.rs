//! Catch-all chain ordering and the static site handler.

mod common;

use std::sync::Arc;

use common::{dev_site, http_client, prod_site, TestServer};
use gossamer::config::RedirectRule;
use gossamer::{ServerEnvironment, ServerGlobals, SiteLayout};

#[tokio::test]
async fn test_redirect_chain_folds_cumulatively() {
    let (_guard, mut config) = dev_site();
    config.redirects = vec![
        RedirectRule {
            from: "/old/([^/]*)".into(),
            to: "/new/$1".into(),
        },
        RedirectRule {
            from: "/new/(.*)".into(),
            to: "/v2/$1".into(),
        },
    ];
    let server = TestServer::start(
        ServerEnvironment::Dev,
        SiteLayout::Static,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .await;

    let resp = http_client()
        .get(server.url("/old/alpha"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 301);
    assert_eq!(resp.headers().get("location").unwrap(), "/v2/alpha");

    server.stop().await;
}

#[tokio::test]
async fn test_redirect_shadows_existing_file() {
    let (_guard, mut config) = dev_site();
    std::fs::write(
        config.paths.dev.content_root.join("page.html"),
        "<html>real</html>",
    )
    .unwrap();
    config.redirects = vec![RedirectRule {
        from: "/page.html".into(),
        to: "/elsewhere".into(),
    }];
    let server = TestServer::start(
        ServerEnvironment::Dev,
        SiteLayout::Static,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .await;

    let resp = http_client()
        .get(server.url("/page.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 301);
    assert_eq!(resp.headers().get("location").unwrap(), "/elsewhere");

    server.stop().await;
}

#[tokio::test]
async fn test_script_and_map_served_from_any_tail() {
    let (_guard, config) = dev_site();
    let server = TestServer::start(
        ServerEnvironment::Dev,
        SiteLayout::Static,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .await;

    let resp = http_client()
        .get(server.url("/site.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("console.log"));

    // Deep links still resolve to the same script.
    let resp = http_client()
        .get(server.url("/some/nested/page/site.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = http_client()
        .get(server.url("/site.js.map"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("version"));

    server.stop().await;
}

#[tokio::test]
async fn test_dev_extra_handler_serves_content_root() {
    let (_guard, mut config) = dev_site();
    std::fs::write(
        config.paths.dev.content_root.join("styles.css"),
        "body { margin: 0 }",
    )
    .unwrap();
    config.redirects = vec![];
    let server = TestServer::start(
        ServerEnvironment::Dev,
        SiteLayout::Static,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .await;

    let resp = http_client()
        .get(server.url("/styles.css"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "text/css");

    server.stop().await;
}

#[tokio::test]
async fn test_accept_guard_blocks_index_for_subresources() {
    let (_guard, config) = dev_site();
    let server = TestServer::start(
        ServerEnvironment::Dev,
        SiteLayout::Static,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .await;

    let resp = http_client()
        .get(server.url("/favicon.ico"))
        .header("accept", "image/*")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "");

    server.stop().await;
}

#[tokio::test]
async fn test_index_fallback_for_html_navigation() {
    let (_guard, config) = dev_site();
    let server = TestServer::start(
        ServerEnvironment::Dev,
        SiteLayout::Static,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .await;

    let resp = http_client()
        .get(server.url("/deep/client/route"))
        .header("accept", "text/html,application/xhtml+xml")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "text/html");
    assert!(resp.text().await.unwrap().contains("index"));

    server.stop().await;
}

#[tokio::test]
async fn test_prod_static_missing_subresource_is_plain_404() {
    let (_guard, mut config) = prod_site();
    // A static export with no 404 page of its own.
    config.paths.prod.site_root = {
        let dir = config.paths.prod.site_root.parent().unwrap().join("flat");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>static</html>").unwrap();
        dir
    };
    let server = TestServer::start(
        ServerEnvironment::Prod,
        SiteLayout::Static,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .await;

    let resp = http_client()
        .get(server.url("/favicon.ico"))
        .header("accept", "image/*")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "");

    // The index itself still resolves.
    let resp = http_client().get(server.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("static"));

    server.stop().await;
}

#[tokio::test]
async fn test_prod_static_html_resolution_and_404_page() {
    let (_guard, config) = prod_site();
    let site = config.paths.prod.site_root.clone();
    std::fs::write(site.join("about.html"), "<html>about page</html>").unwrap();
    std::fs::write(site.join("404.html"), "<html>custom miss</html>").unwrap();
    let server = TestServer::start(
        ServerEnvironment::Prod,
        SiteLayout::Static,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .await;

    let resp = http_client()
        .get(server.url("/about"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("about page"));

    let resp = http_client()
        .get(server.url("/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert!(resp.text().await.unwrap().contains("custom miss"));

    server.stop().await;
}

#[tokio::test]
async fn test_prod_fullstack_serves_exported_pages_extensionless() {
    let (_guard, config) = prod_site();
    let server = TestServer::start(
        ServerEnvironment::Prod,
        SiteLayout::Fullstack,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .await;

    let resp = http_client()
        .get(server.url("/about"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("about"));

    let resp = http_client()
        .get(server.url("/blog/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("blog"));

    let resp = http_client()
        .get(server.url("/css/app.css"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "text/css");

    server.stop().await;
}

#[tokio::test]
async fn test_prod_fullstack_requires_system_folder() {
    let (_guard, config) = prod_site();
    std::fs::remove_dir_all(config.paths.prod.site_root.join("system")).unwrap();

    let err = gossamer::build_site_router(
        ServerEnvironment::Prod,
        SiteLayout::Fullstack,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .err()
    .expect("assembly should fail without system/");
    assert!(err.to_string().contains("system/"));
}

#[tokio::test]
async fn test_base_path_prefixes_all_routes() {
    let (_guard, mut config) = dev_site();
    config.base_path = "/docs/".into();
    let server = TestServer::start(
        ServerEnvironment::Dev,
        SiteLayout::Static,
        &config,
        None,
        Arc::new(ServerGlobals::new()),
    )
    .await;

    let resp = http_client()
        .get(server.url("/docs/site.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = http_client()
        .get(server.url("/docs"))
        .header("accept", "text/html")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    server.stop().await;
}
