//! End-to-end tests driving the composed gateway router.

use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::Response,
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use futures_util::future::BoxFuture;
use sha2::{Digest, Sha256};

use filegate::config::schema::{
    AliasConfig, HeaderEntry, PathHeadersConfig, PathHostsConfig, ProxyMode, ProxyRuleConfig, UserConfig,
    VhostConfig,
};
use filegate::http::{Flow, PreMiddleware};
use filegate::security::credentials::Encoding;
use filegate::{Gateway, GatewayConfig};

mod common;
use common::{get, send, start_echo_backend, write_file};

fn app(vhosts: Vec<VhostConfig>) -> Router {
    let config = GatewayConfig {
        vhosts,
        ..Default::default()
    };
    Gateway::new(config).unwrap().router()
}

fn vhost(root: &std::path::Path) -> VhostConfig {
    VhostConfig {
        root: root.to_path_buf(),
        ..Default::default()
    }
}

fn with_header(mut request: Request<Body>, name: &'static str, value: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(name, HeaderValue::from_str(value).unwrap());
    request
}

#[tokio::test]
async fn test_vhost_selection_by_host() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    write_file(a.path(), "who.txt", "a");
    write_file(b.path(), "who.txt", "b");

    let app = app(vec![
        VhostConfig {
            hostnames: vec!["a.local".into()],
            ..vhost(a.path())
        },
        vhost(b.path()),
    ]);

    assert_eq!(send(&app, get("/who.txt", Some("A.LOCAL:8080"))).await.body, "a");
    assert_eq!(send(&app, get("/who.txt", Some("c.local"))).await.body, "b");
    assert_eq!(send(&app, get("/who.txt", None)).await.body, "b");
}

#[tokio::test]
async fn test_prefix_transform() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "who.txt", "x");
    let app = app(vec![VhostConfig {
        prefix_urls: vec!["/files".into()],
        ..vhost(root.path())
    }]);

    let redirect = send(&app, get("/files", None)).await;
    assert_eq!(redirect.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(redirect.headers[header::LOCATION], "/files/");

    let file = send(&app, get("/files/who.txt", None)).await;
    assert_eq!(file.status, StatusCode::OK);
    assert_eq!(file.body, "x");

    assert_eq!(send(&app, get("/who.txt", None)).await.status, StatusCode::NOT_FOUND);
}

struct PathGuard {
    seen: Arc<Mutex<Vec<String>>>,
}

impl PreMiddleware for PathGuard {
    fn process<'a>(&'a self, request: Request<Body>) -> BoxFuture<'a, Flow> {
        Box::pin(async move {
            let path = request.uri().path().to_string();
            self.seen.lock().unwrap().push(path.clone());
            if path.starts_with("/files/private") {
                let mut response = Response::new(Body::from("blocked"));
                *response.status_mut() = StatusCode::FORBIDDEN;
                Flow::Respond(response)
            } else {
                Flow::Continue(request)
            }
        })
    }
}

#[tokio::test]
async fn test_preprocess_sees_original_path_and_short_circuits() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "who.txt", "x");
    write_file(root.path(), "private/key", "k");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let config = GatewayConfig {
        vhosts: vec![VhostConfig {
            prefix_urls: vec!["/files".into()],
            ..vhost(root.path())
        }],
        ..Default::default()
    };
    let app = Gateway::builder(config)
        .pre_middleware(PathGuard {
            seen: Arc::clone(&seen),
        })
        .build()
        .unwrap()
        .router();

    assert_eq!(send(&app, get("/files/who.txt", None)).await.body, "x");
    let blocked = send(&app, get("/files/private/key", None)).await;
    assert_eq!(blocked.status, StatusCode::FORBIDDEN);
    assert_eq!(blocked.body, "blocked");

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["/files/who.txt".to_string(), "/files/private/key".to_string()]
    );
}

fn basic(user: &str, password: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{user}:{password}"))
    )
}

#[tokio::test]
async fn test_basic_auth_on_protected_urls() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "public.txt", "pub");
    write_file(root.path(), "private/doc.txt", "secret doc");

    let mut config = vhost(root.path());
    config.auth.urls.push("/private".into());
    config.users.push(UserConfig {
        username: "alice".into(),
        password: hex::encode(Sha256::digest(b"secret")),
        encoding: Encoding::Sha256,
    });
    let app = app(vec![config]);

    assert_eq!(send(&app, get("/public.txt", None)).await.status, StatusCode::OK);

    let challenged = send(&app, get("/private/doc.txt", None)).await;
    assert_eq!(challenged.status, StatusCode::UNAUTHORIZED);
    assert!(challenged.headers[header::WWW_AUTHENTICATE]
        .to_str()
        .unwrap()
        .starts_with("Basic"));

    let wrong = with_header(get("/private/doc.txt", None), "authorization", &basic("alice", "nope"));
    assert_eq!(send(&app, wrong).await.status, StatusCode::UNAUTHORIZED);

    let right = with_header(get("/private/doc.txt", None), "authorization", &basic("ALICE", "secret"));
    let response = send(&app, right).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "secret doc");
}

#[tokio::test]
async fn test_dir_auth_with_relative_root() {
    // Created below the working directory, so its path is relative.
    let root = tempfile::tempdir_in(".").unwrap();
    assert!(root.path().is_relative());
    write_file(root.path(), "private/doc.txt", "secret");
    write_file(root.path(), "open.txt", "open");

    let cwd = std::env::current_dir().unwrap();
    let mut config = vhost(root.path());
    config.auth.dirs.push(cwd.join(root.path()).join("other/../private"));
    config.users.push(UserConfig {
        username: "alice".into(),
        password: "pw".into(),
        encoding: Encoding::Plain,
    });
    let app = app(vec![config]);

    assert_eq!(send(&app, get("/open.txt", None)).await.status, StatusCode::OK);
    assert_eq!(
        send(&app, get("/private/doc.txt", None)).await.status,
        StatusCode::UNAUTHORIZED
    );

    let authed = with_header(get("/private/doc.txt", None), "authorization", &basic("alice", "pw"));
    let response = send(&app, authed).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "secret");
}

#[tokio::test]
async fn test_restrict_access_and_vary() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "img/a.png", "png");
    write_file(root.path(), "doc.txt", "doc");

    let mut config = vhost(root.path());
    config.restrict_access.urls.push(PathHostsConfig {
        path: "/img".into(),
        hosts: vec!["blog.example".into()],
    });
    let app = app(vec![config]);

    let request = |referer: &str| with_header(get("/img/a.png", Some("files.local")), "referer", referer);

    let denied = send(&app, request("http://evil.example/page")).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.headers[header::VARY], "accept-encoding, referer, origin");

    assert_eq!(send(&app, request("https://blog.example/post")).await.status, StatusCode::OK);
    assert_eq!(send(&app, request("http://files.local/index")).await.status, StatusCode::OK);
    assert_eq!(send(&app, get("/img/a.png", Some("files.local"))).await.status, StatusCode::OK);

    let unrestricted = with_header(get("/doc.txt", Some("files.local")), "referer", "http://evil.example/");
    let response = send(&app, unrestricted).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.headers[header::VARY].to_str().unwrap().contains("referer"));
}

#[tokio::test]
async fn test_extra_headers_url_then_dir() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "assets/app.js", "js");

    let mut config = vhost(root.path());
    config.headers.urls.push(PathHeadersConfig {
        path: "/".into(),
        headers: vec![HeaderEntry {
            name: "X-Frame-Options".into(),
            value: "DENY".into(),
        }],
    });
    config.headers.dirs.push(PathHeadersConfig {
        path: root.path().join("assets").to_string_lossy().into_owned(),
        headers: vec![HeaderEntry {
            name: "X-Asset".into(),
            value: "1".into(),
        }],
    });
    let app = app(vec![config]);

    let response = send(&app, get("/assets/app.js", None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert_eq!(response.headers["x-asset"], "1");
    assert_eq!(response.headers[header::VARY], "accept-encoding");
}

#[tokio::test]
async fn test_hidden_entries_and_listing() {
    let root = tempfile::tempdir().unwrap();
    let mounted = tempfile::tempdir().unwrap();
    write_file(root.path(), "a.txt", "a");
    write_file(root.path(), "secret.txt", "s");
    write_file(root.path(), ".git/config", "c");
    write_file(root.path(), "sub/b.txt", "b");

    let mut config = vhost(root.path());
    config.visibility.hides = Some(vec!["secret*".into()]);
    config.visibility.hide_dirs = Some(vec![".git".into()]);
    config.aliases.push(AliasConfig {
        url: "/mnt".into(),
        path: mounted.path().to_path_buf(),
        exact: false,
    });
    config.archive.global = true;
    let app = app(vec![config]);

    assert_eq!(send(&app, get("/secret.txt", None)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(send(&app, get("/.git/config", None)).await.status, StatusCode::NOT_FOUND);

    let listing = send(&app, get("/", None)).await;
    assert_eq!(listing.status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&listing.body).unwrap();
    let names: Vec<&str> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.txt", "mnt", "sub"]);
    assert_eq!(json["archive"], true);
    assert_eq!(json["upload"], false);
}

#[tokio::test]
async fn test_fallback_proxy_only_for_missing() {
    let upstream = start_echo_backend().await;
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "present.txt", "local");

    let mut config = vhost(root.path());
    config.proxies.push(ProxyRuleConfig {
        url: "/".into(),
        target: format!("http://{upstream}/up"),
        mode: ProxyMode::Fallback,
        ignore_bad_cert: false,
    });
    let app = app(vec![config]);

    let local = send(&app, get("/present.txt", None)).await;
    assert_eq!(local.body, "local");
    assert!(!local.headers.contains_key("x-upstream"));

    let proxied = send(&app, get("/missing/x?q=1", None)).await;
    assert_eq!(proxied.status, StatusCode::OK);
    assert_eq!(proxied.body, "/up/missing/x?q=1");
    assert_eq!(proxied.headers["x-upstream"], "echo");
}

#[tokio::test]
async fn test_shadowing_proxy_beats_local_alias() {
    let upstream = start_echo_backend().await;
    let root = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    write_file(docs.path(), "readme", "local readme");
    write_file(root.path(), "other.txt", "other");

    let mut config = vhost(root.path());
    config.aliases.push(AliasConfig {
        url: "/docs".into(),
        path: docs.path().to_path_buf(),
        exact: false,
    });
    config.proxies.push(ProxyRuleConfig {
        url: "/docs".into(),
        target: format!("http://{upstream}/remote"),
        mode: ProxyMode::Always,
        ignore_bad_cert: false,
    });
    let app = app(vec![config]);

    assert_eq!(send(&app, get("/docs/readme", None)).await.body, "/remote/readme");
    assert_eq!(send(&app, get("/other.txt", None)).await.body, "other");
}

#[tokio::test]
async fn test_cors_preflight_and_methods() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "a.txt", "a");
    let mut config = vhost(root.path());
    config.cors.global = true;
    let app = app(vec![config]);

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/a.txt")
        .header("origin", "https://app.example")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, preflight).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example"
    );

    let post = Request::builder()
        .method(Method::POST)
        .uri("/a.txt")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, post).await.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_preflight_on_protected_path_skips_auth() {
    let root = tempfile::tempdir().unwrap();
    write_file(root.path(), "private/a.txt", "a");
    let mut config = vhost(root.path());
    config.cors.global = true;
    config.auth.urls.push("/private".into());
    config.users.push(UserConfig {
        username: "alice".into(),
        password: "pw".into(),
        encoding: Encoding::Plain,
    });
    let app = app(vec![config]);

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/private/a.txt")
        .header("origin", "https://app.example")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "authorization")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, preflight).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example"
    );

    // The actual request still needs credentials.
    let plain = with_header(get("/private/a.txt", None), "origin", "https://app.example");
    assert_eq!(send(&app, plain).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_id_is_set_or_propagated() {
    let root = tempfile::tempdir().unwrap();
    let app = app(vec![vhost(root.path())]);

    let generated = send(&app, get("/", None)).await;
    assert!(generated.headers.contains_key("x-request-id"));

    let supplied = with_header(get("/", None), "x-request-id", "abc-123");
    assert_eq!(send(&app, supplied).await.headers["x-request-id"], "abc-123");
}
