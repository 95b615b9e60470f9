// SPDX-License-Identifier: Apache-2.0

use adaptwiki_auth::sync_login;
use adaptwiki_model::{IdentityClaims, IndicatorBody, NewPage, PageBody, RealmAccess, UserId};
use adaptwiki_server::{build_router, AppState, ServerConfig, TracingMailer};
use adaptwiki_store::pages::create_page;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn test_config() -> ServerConfig {
    ServerConfig {
        session_secret: "endpoints-contract-secret".to_string(),
        ..ServerConfig::default()
    }
}

fn claims(email: &str, username: &str, roles: &[&str]) -> IdentityClaims {
    IdentityClaims {
        email: Some(email.to_string()),
        preferred_username: Some(username.to_string()),
        given_name: None,
        family_name: None,
        realm_access: Some(RealmAccess {
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }),
    }
}

struct TestServer {
    addr: std::net::SocketAddr,
    state: AppState,
}

async fn serve() -> TestServer {
    let conn = adaptwiki_store::open_in_memory().expect("open memory db");
    let state =
        AppState::new(conn, test_config(), Arc::new(TracingMailer)).expect("app state");
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });
    TestServer { addr, state }
}

impl TestServer {
    /// Provision a user with the given realm roles and return a session
    /// token for them.
    async fn token_for(&self, email: &str, username: &str, roles: &[&str]) -> String {
        let conn = self.state.db.lock().await;
        let synced = sync_login(&conn, &claims(email, username, roles))
            .expect("sync")
            .expect("user");
        self.state
            .signer
            .issue(synced.user.id, now_secs())
            .expect("token")
    }

    async fn seed_indicator(&self, title: &str, dimension: &str) -> i64 {
        let conn = self.state.db.lock().await;
        let page = create_page(
            &conn,
            &NewPage {
                parent_id: None,
                title: title.to_string(),
                slug: None,
                live: true,
                owner: Some(UserId(1)),
                body: PageBody::Indicator(IndicatorBody {
                    description: format!("{title} description"),
                    dimension: dimension.to_string(),
                    indicator_type: String::new(),
                    entry_author: String::new(),
                }),
            },
        )
        .expect("seed indicator");
        page.id.0
    }
}

async fn send_raw(
    addr: std::net::SocketAddr,
    method: &str,
    path: &str,
    token: Option<&str>,
    json_body: Option<&str>,
) -> (u16, String) {
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(token) = token {
        req.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    match json_body {
        Some(body) => {
            req.push_str("Content-Type: application/json\r\n");
            req.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
        }
        None => req.push_str("\r\n"),
    }

    let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
    stream.write_all(req.as_bytes()).await.expect("write");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    (status, body.to_string())
}

#[tokio::test]
async fn healthz_answers() {
    let server = serve().await;
    let (status, body) = send_raw(server.addr, "GET", "/healthz", None, None).await;
    assert_eq!(status, 200);
    assert!(body.contains("ok"));
}

#[tokio::test]
async fn search_browses_by_kind_and_clamps_bad_pages() {
    let server = serve().await;
    server.seed_indicator("Drought exposure", "Water").await;
    server.seed_indicator("Heat stress", "Climate").await;

    let (status, body) = send_raw(server.addr, "GET", "/search?type=indicator", None, None).await;
    assert_eq!(status, 200);
    assert!(body.contains("Drought exposure"));
    assert!(body.contains("Heat stress"));
    assert!(body.contains("\"dimensions\":[\"Climate\",\"Water\"]"));

    // No query and no kind filter: an empty result set, not a dump.
    let (status, body) = send_raw(server.addr, "GET", "/search", None, None).await;
    assert_eq!(status, 200);
    assert!(body.contains("\"results\":[]"));

    // Bad pagination input is clamped, never an error.
    let (status, _) = send_raw(
        server.addr,
        "GET",
        "/search?type=indicator&page=abc",
        None,
        None,
    )
    .await;
    assert_eq!(status, 200);
    let (status, _) = send_raw(
        server.addr,
        "GET",
        "/search?type=indicator&page=9999",
        None,
        None,
    )
    .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn history_is_gated_by_capability() {
    let server = serve().await;
    let (status, _) = send_raw(server.addr, "GET", "/admin/history", None, None).await;
    assert_eq!(status, 401);

    let outsider = server.token_for("o@example.org", "outsider", &[]).await;
    let (status, _) =
        send_raw(server.addr, "GET", "/admin/history", Some(&outsider), None).await;
    assert_eq!(status, 403);

    server.seed_indicator("Drought exposure", "Water").await;
    let reviewer = server
        .token_for("r@example.org", "reviewer", &["Reviewer"])
        .await;
    let (status, body) =
        send_raw(server.addr, "GET", "/admin/history", Some(&reviewer), None).await;
    assert_eq!(status, 200);
    assert!(body.contains("\"action\":\"Created\""));
    assert!(body.contains("Drought exposure"));
}

#[tokio::test]
async fn login_returns_a_usable_token_and_fails_closed_without_email() {
    let server = serve().await;
    let body = serde_json::to_string(&claims("a@example.org", "ariver", &["Administrator"]))
        .expect("claims json");
    let (status, response) =
        send_raw(server.addr, "POST", "/auth/login", None, Some(&body)).await;
    assert_eq!(status, 200);
    assert!(response.contains("\"capability\":\"admin\""));

    let no_email = r#"{"preferred_username":"ghost","realm_access":{"roles":["Administrator"]}}"#;
    let (status, _) =
        send_raw(server.addr, "POST", "/auth/login", None, Some(no_email)).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn cardinality_violation_surfaces_the_contract_error() {
    let server = serve().await;
    let dev = server
        .token_for("d@example.org", "dev", &["ContentDeveloper"])
        .await;
    let ind = server.seed_indicator("Drought exposure", "Water").await;

    for i in 1..=3 {
        let metric = serde_json::json!({
            "parent_id": ind,
            "title": format!("Metric {i}"),
            "live": true,
            "body": {"kind": "metric"}
        })
        .to_string();
        let (status, _) =
            send_raw(server.addr, "POST", "/admin/pages", Some(&dev), Some(&metric)).await;
        assert_eq!(status, 201);
    }

    let fourth = serde_json::json!({
        "parent_id": ind,
        "title": "Metric 4",
        "live": true,
        "body": {"kind": "metric"}
    })
    .to_string();
    let (status, body) =
        send_raw(server.addr, "POST", "/admin/pages", Some(&dev), Some(&fourth)).await;
    assert_eq!(status, 400);
    assert!(body.contains("\"field\":\"title\""));
    assert!(body.contains("Each Indicator can only have up to 3 Metrics."));
}

#[tokio::test]
async fn forms_reject_bad_input_and_accept_good_input() {
    let server = serve().await;
    let bad = r#"{"name":"","email":"not-an-email","message":"hi"}"#;
    let (status, body) =
        send_raw(server.addr, "POST", "/become-editor", None, Some(bad)).await;
    assert_eq!(status, 400);
    assert!(body.contains("This field is required."));
    assert!(body.contains("Enter a valid email address."));

    let good = r#"{"name":"Alex","email":"a@example.org","message":"I want to help."}"#;
    let (status, body) = send_raw(server.addr, "POST", "/feedback", None, Some(good)).await;
    assert_eq!(status, 200);
    assert!(body.contains("submitted successfully"));
}
