use axum::http::StatusCode;
use devctl_core::auth::Capability;
use devctl_core::config::{Config, TokenConfig};
use devctl_core::exec::testing::{Reply, ScriptedExecutor};
use devctl_server::{build_router, AppState};
use http_body_util::BodyExt;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN: &str = "admin-token-0123456789";
const VIEWER: &str = "viewer-token-0123456789";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestApp {
    dir: TempDir,
    exec: Arc<ScriptedExecutor>,
    router: axum::Router,
}

fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.rate_limit.burst = 1000;
    cfg.tokens = vec![
        TokenConfig {
            user: "admin".into(),
            token: ADMIN.into(),
            capabilities: Capability::all().to_vec(),
        },
        TokenConfig {
            user: "viewer".into(),
            token: VIEWER.into(),
            capabilities: vec![Capability::View],
        },
    ];
    cfg
}

fn app_with(cfg: Config, replies: impl IntoIterator<Item = Reply>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let exec = Arc::new(ScriptedExecutor::with_replies(replies));
    let state = AppState::with_executor(cfg, dir.path(), exec.clone());
    TestApp {
        dir,
        exec,
        router: build_router(state),
    }
}

fn app(replies: impl IntoIterator<Item = Reply>) -> TestApp {
    app_with(test_config(), replies)
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: &axum::Router, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut builder = axum::http::Request::builder().uri(uri);
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    let req = builder.body(axum::body::Body::empty()).unwrap();
    send(app, req).await
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: &axum::Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let mut builder = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    let req = builder
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, req).await
}

async fn send(
    app: &axum::Router,
    req: axum::http::Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_needs_no_token() {
    let t = app([]);
    let (status, body) = get(&t.router, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_without_token_is_401() {
    let t = app([]);
    let (status, body) = get(&t.router, "/api/containers", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(t.exec.call_count(), 0);
}

#[tokio::test]
async fn viewer_cannot_manage_containers() {
    let t = app([]);
    let (status, body) = post_json(
        &t.router,
        "/api/containers/manage",
        Some(VIEWER),
        serde_json::json!({"action": "start", "container": "web-01"}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("containers"));
    assert_eq!(t.exec.call_count(), 0);
}

#[tokio::test]
async fn viewer_cannot_backup() {
    let t = app([]);
    let (status, _) = post_json(
        &t.router,
        "/api/backups",
        Some(VIEWER),
        serde_json::json!({"action": "backup"}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(t.exec.call_count(), 0);
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_container_via_body() {
    let t = app([Reply::ok("web-01")]);
    let (status, body) = post_json(
        &t.router,
        "/api/containers/manage",
        Some(ADMIN),
        serde_json::json!({"action": "start", "container": "web-01"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Container started successfully");
    assert_eq!(body["action"], "start");
    assert_eq!(body["container"], "web-01");
    assert_eq!(t.exec.calls()[0].argv(), vec!["docker", "start", "web-01"]);
}

#[tokio::test]
async fn restart_container_via_path() {
    let t = app([Reply::ok("db")]);
    let (status, body) = post_json(
        &t.router,
        "/api/containers/db/restart",
        Some(ADMIN),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(t.exec.calls()[0].argv(), vec!["docker", "restart", "db"]);
}

#[tokio::test]
async fn bad_container_name_is_400() {
    let t = app([]);
    let (status, body) = post_json(
        &t.router,
        "/api/containers/manage",
        Some(ADMIN),
        serde_json::json!({"action": "restart", "container": "../etc"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(t.exec.call_count(), 0);
}

#[tokio::test]
async fn unknown_action_is_400() {
    let t = app([]);
    let (status, _) = post_json(
        &t.router,
        "/api/containers/web/kill",
        Some(ADMIN),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.exec.call_count(), 0);
}

#[tokio::test]
async fn malformed_json_gets_failure_body() {
    let t = app([]);
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/containers/manage")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {ADMIN}"))
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&t.router, req).await;
    assert!(status.is_client_error());
    assert_eq!(body["success"], false);
    assert_eq!(t.exec.call_count(), 0);
}

#[tokio::test]
async fn subprocess_failure_is_200_with_success_false() {
    let t = app([Reply::fail(1, "Error: No such container: ghost")]);
    let (status, body) = post_json(
        &t.router,
        "/api/containers/ghost/stop",
        Some(ADMIN),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["exit_code"], 1);
    assert!(body["output"].as_str().unwrap().contains("No such container"));
}

#[tokio::test]
async fn logs_default_and_explicit() {
    let t = app([Reply::ok("a\nb"), Reply::ok("")]);
    let (status, body) = get(&t.router, "/api/containers/db/logs?lines=50", Some(VIEWER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logs"], "a\nb");
    assert_eq!(body["lines"], 50);

    let (_, body) = get(&t.router, "/api/containers/db/logs", Some(VIEWER)).await;
    assert_eq!(body["lines"], 100);

    let calls = t.exec.calls();
    assert_eq!(calls[0].argv(), vec!["docker", "logs", "--tail", "50", "db"]);
    assert_eq!(calls[1].argv(), vec!["docker", "logs", "--tail", "100", "db"]);
}

#[tokio::test]
async fn container_listing() {
    let ps = concat!(
        r#"{"ID":"1","Names":"web","Image":"nginx","Status":"Up 1 hour","Ports":"80/tcp"}"#,
        "\nwarning: not json\n",
        r#"{"ID":"2","Names":"db","Image":"mysql","Status":"Exited (0)","Ports":""}"#,
    );
    let t = app([Reply::ok(ps)]);
    let (status, body) = get(&t.router, "/api/containers", Some(VIEWER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["containers"][0]["name"], "web");
    assert_eq!(body["containers"][1]["name"], "db");
}

// ---------------------------------------------------------------------------
// Backups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn backup_list_restore_flow() {
    let t = app([Reply::dump("-- dump"), Reply::ok("")]);

    let (status, body) = post_json(
        &t.router,
        "/api/backups",
        Some(ADMIN),
        serde_json::json!({"action": "backup", "filename": "nightly.sql"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Backup created: nightly.sql");
    assert!(t.dir.path().join(".devctl/backups/nightly.sql").is_file());

    let (_, list) = get(&t.router, "/api/backups", Some(VIEWER)).await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["backups"][0]["filename"], "nightly.sql");
    assert!(list["backups"][0].get("path").is_none());

    let (status, body) = post_json(
        &t.router,
        "/api/backups",
        Some(ADMIN),
        serde_json::json!({"action": "restore", "filename": "nightly.sql"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Restore completed: nightly.sql");
}

#[tokio::test]
async fn duplicate_backup_is_409() {
    let t = app([Reply::dump("-- dump")]);
    let body = serde_json::json!({"action": "backup", "filename": "once.sql"});
    let (status, _) = post_json(&t.router, "/api/backups", Some(ADMIN), body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, resp) = post_json(&t.router, "/api/backups", Some(ADMIN), body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(resp["success"], false);
    assert_eq!(t.exec.call_count(), 1);
}

#[tokio::test]
async fn restore_missing_file_is_404() {
    let t = app([]);
    let (status, body) = post_json(
        &t.router,
        "/api/backups",
        Some(ADMIN),
        serde_json::json!({"action": "restore", "filename": "missing.sql"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("missing.sql"));
    assert_eq!(t.exec.call_count(), 0);
}

#[tokio::test]
async fn restore_without_filename_is_400() {
    let t = app([]);
    let (status, _) = post_json(
        &t.router,
        "/api/backups",
        Some(ADMIN),
        serde_json::json!({"action": "restore"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disabled_service_is_503() {
    let mut cfg = test_config();
    cfg.enabled = false;
    let t = app_with(cfg, []);
    let (status, body) = get(&t.router, "/api/system", Some(ADMIN)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn system_info_shape() {
    let mut cfg = test_config();
    cfg.docker.path = "__devctl_missing_docker__".into();
    let t = app_with(cfg, []);
    let (status, body) = get(&t.router, "/api/system", Some(VIEWER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["docker"]["available"], false);
    assert!(body["hostname"].is_string());
    assert!(body["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn metrics_shape() {
    let ps = r#"{"ID":"1","Names":"web","State":"running","Status":"Up"}"#;
    let t = app([Reply::ok(ps), Reply::fail(1, "Can't connect to MySQL server")]);
    let (status, body) = get(&t.router, "/api/metrics", Some(VIEWER)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metrics"]["containers_total"], 1);
    assert_eq!(body["metrics"]["containers_running"], 1);
    assert!(body["metrics"]["db_threads_connected"].is_null());
}

#[tokio::test]
async fn rate_limit_returns_429() {
    let mut cfg = test_config();
    cfg.rate_limit.burst = 2;
    cfg.rate_limit.requests_per_second = 0.001;
    let t = app_with(cfg, []);
    for _ in 0..2 {
        let (status, _) = get(&t.router, "/api/backups", Some(VIEWER)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = get(&t.router, "/api/backups", Some(VIEWER)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
}
