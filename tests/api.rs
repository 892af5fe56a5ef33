//! Integration tests for the project catalog and admin auth routes.
//! Spins up the real server on a random port and talks to it over HTTP.

use foliod::{config::DaemonConfig, rest, AppContext};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

/// Start a server on a random port against a throwaway data dir.
async fn spawn_server() -> (String, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = DaemonConfig::new(
        None,
        Some(dir.path().to_path_buf()),
        Some("error".to_string()),
        None,
    );
    config.admin_secret = "s3cret".to_string();

    let ctx = Arc::new(AppContext::new(config));
    ctx.store.ensure_initialized().await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = rest::serve(ctx, listener).await;
    });

    (format!("http://{addr}"), dir)
}

async fn login(client: &reqwest::Client, base: &str) -> String {
    let body: Value = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "password": "s3cret" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base}/api/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"].as_str().unwrap(), env!("CARGO_PKG_VERSION"));
    assert!(body["uptimeSecs"].is_number());
}

#[tokio::test]
async fn unknown_route_is_a_structured_404() {
    let (base, _dir) = spawn_server().await;
    let res = reqwest::get(format!("{base}/api/nope")).await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn login_with_wrong_secret_is_401() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert!(body.get("token").is_none(), "no token on a failed login");
}

#[tokio::test]
async fn login_issues_a_usable_token() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "password": "s3cret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap();
    assert!(!token.is_empty());
    assert_eq!(body["expiresInMinutes"], 120);

    // the token opens the write path
    let res = client
        .post(format!("{base}/api/projects"))
        .bearer_auth(token)
        .json(&json!({
            "title": "t", "description": "d", "githubUrl": "https://github.com/me/t"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
}

#[tokio::test]
async fn create_requires_a_token() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/projects"))
        .json(&json!({
            "title": "t", "description": "d", "githubUrl": "https://github.com/me/t"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = client
        .post(format!("{base}/api/projects"))
        .bearer_auth("made-up-token")
        .json(&json!({
            "title": "t", "description": "d", "githubUrl": "https://github.com/me/t"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn create_without_title_is_400_and_changes_nothing() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let token = login(&client, &base).await;

    let res = client
        .post(format!("{base}/api/projects"))
        .bearer_auth(&token)
        .json(&json!({ "description": "d", "githubUrl": "gh" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let projects: Vec<Value> = reqwest::get(format!("{base}/api/projects"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(projects.is_empty());
}

#[tokio::test]
async fn sequential_creates_list_newest_first() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let token = login(&client, &base).await;

    for title in ["older", "first", "second"] {
        let res = client
            .post(format!("{base}/api/projects"))
            .bearer_auth(&token)
            .json(&json!({
                "title": title, "description": "d", "githubUrl": "gh",
                "tags": "rust, axum"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 201);
    }

    let projects: Vec<Value> = reqwest::get(format!("{base}/api/projects"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<&str> = projects
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["second", "first", "older"]);
    assert_eq!(projects[0]["tags"], json!(["rust", "axum"]));
}

#[tokio::test]
async fn delete_removes_exactly_the_named_record() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let token = login(&client, &base).await;

    let mut ids = Vec::new();
    for title in ["keep", "drop"] {
        let created: Value = client
            .post(format!("{base}/api/projects"))
            .bearer_auth(&token)
            .json(&json!({ "title": title, "description": "d", "githubUrl": "gh" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(created["id"].as_str().unwrap().to_string());
    }

    let res = client
        .delete(format!("{base}/api/projects/{}", ids[1]))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let projects: Vec<Value> = reqwest::get(format!("{base}/api/projects"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["id"].as_str().unwrap(), ids[0]);

    // deleting an unknown id is a 404 and leaves the collection alone
    let res = client
        .delete(format!("{base}/api/projects/no-such-id"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn delete_requires_a_token() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();
    let res = client
        .delete(format!("{base}/api/projects/some-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn malformed_json_is_a_generic_400() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "invalid payload");
}

#[tokio::test]
async fn oversized_body_is_413() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let huge = format!(
        r#"{{"name":"a","email":"a@b.c","message":"{}"}}"#,
        "x".repeat(1_100_000)
    );
    let res = client
        .post(format!("{base}/api/contact"))
        .header("content-type", "application/json")
        .body(huge)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);
}

#[tokio::test]
async fn cors_mirrors_the_request_origin_under_wildcard() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base}/api/projects"))
        .header("origin", "https://portfolio.example")
        .send()
        .await
        .unwrap();
    assert_eq!(
        res.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("https://portfolio.example")
    );
}
