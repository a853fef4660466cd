//! Integration tests for the broadcast hub.
//!
//! Each test starts the real router in-process on an ephemeral port and drives
//! it over WebSocket (`tokio-tungstenite`) and HTTP (`reqwest`).

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use shoutout_server::{config::HubConfig, ui::serve, ui::state::AppState};
use shoutout_shared::time::SystemClock;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message, client::IntoClientRequest, http::HeaderValue},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SECRET: &str = "test-secret";
const ADMIN: &str = "admin-secret";
const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// Helper struct to manage an in-process hub
struct TestHub {
    addr: SocketAddr,
    tokens_file: PathBuf,
    http: reqwest::Client,
}

impl TestHub {
    /// Start a hub with the shared secret only (no invite system)
    async fn start() -> Self {
        Self::start_with(HubConfig::default()).await
    }

    async fn start_with(config: HubConfig) -> Self {
        let tokens_file = std::env::temp_dir().join(format!(
            "shoutout-it-{}.json",
            uuid::Uuid::new_v4().simple()
        ));
        let config = HubConfig {
            broadcast_secret: Some(SECRET.to_string()),
            admin_token: Some(ADMIN.to_string()),
            tokens_file: tokens_file.clone(),
            ..config
        };
        let state = Arc::new(
            AppState::from_config(&config, Arc::new(SystemClock))
                .await
                .expect("Failed to build hub state"),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state, std::future::pending()));

        TestHub {
            addr,
            tokens_file,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn connect(
        &self,
        name: &str,
        token: &str,
        owner: Option<&str>,
    ) -> Result<WsStream, tungstenite::Error> {
        let mut request = format!("ws://{}/ws?name={}", self.addr, name)
            .into_client_request()
            .unwrap();
        let headers = request.headers_mut();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        if let Some(owner) = owner {
            headers.insert("x-client-user", HeaderValue::from_str(owner).unwrap());
        }
        let (ws, _) = connect_async(request).await?;
        Ok(ws)
    }

    /// Connect with the shared secret and wait until the registry lists the session
    async fn join(&self, name: &str) -> WsStream {
        let before = self.users().await.len();
        let ws = self.connect(name, SECRET, None).await.unwrap();
        self.wait_for_user(name, before).await;
        ws
    }

    async fn users(&self) -> Vec<Value> {
        let body: Value = self
            .http
            .get(self.url("/users"))
            .bearer_auth(SECRET)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["users"].as_array().cloned().unwrap_or_default()
    }

    async fn wait_for_user(&self, name: &str, others: usize) {
        for _ in 0..40 {
            let users = self.users().await;
            if users.iter().any(|u| u["name"] == name) && users.len() >= others {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("'{name}' was never admitted");
    }

    async fn user_id(&self, name: &str) -> String {
        self.users()
            .await
            .into_iter()
            .find(|u| u["name"] == name)
            .and_then(|u| u["id"].as_str().map(str::to_string))
            .expect("user not listed")
    }

    async fn broadcast(&self, body: Value) -> reqwest::Response {
        self.http
            .post(self.url("/broadcast"))
            .bearer_auth(SECRET)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestHub {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.tokens_file);
    }
}

/// Next hamster / toast / reaction frame, skipping presence notifications
async fn next_event(ws: &mut WsStream) -> Option<Value> {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, ws.next()).await.ok()??;
        match frame.ok()? {
            Message::Text(text) => {
                let json: Value = serde_json::from_str(text.as_str()).unwrap();
                if json["type"] != "user-status" {
                    return Some(json);
                }
            }
            Message::Close(_) => return None,
            _ => {}
        }
    }
}

/// Close code of the next close frame
async fn next_close_code(ws: &mut WsStream) -> Option<u16> {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, ws.next()).await.ok()??;
        if let Message::Close(close) = frame.ok()? {
            return close.map(|c| u16::from(c.code));
        }
    }
}

/// Send a marker only `name` receives, so earlier frames can be checked for absence
async fn send_marker(hub: &TestHub, name: &str) {
    let response = hub
        .broadcast(json!({"type": "hamster", "variant": "marker", "target": name}))
        .await;
    assert_eq!(response.status(), 200);
}

async fn send_frame(ws: &mut WsStream, frame: Value) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

#[tokio::test]
async fn test_health_and_unknown_path() {
    // テスト項目: /health は ok を返し、未知のパスは 404
    // given (前提条件):
    let hub = TestHub::start().await;

    // when (操作):
    let health = hub.http.get(hub.url("/health")).send().await.unwrap();
    let unknown = hub.http.get(hub.url("/nope")).send().await.unwrap();

    // then (期待する結果):
    assert_eq!(health.status(), 200);
    assert_eq!(health.json::<Value>().await.unwrap(), json!({"ok": true}));
    assert_eq!(unknown.status(), 404);
}

#[tokio::test]
async fn test_connection_without_valid_credential_is_rejected() {
    // テスト項目: 不正な資格情報での接続はアップグレード前に 401 で拒否される
    // given (前提条件):
    let hub = TestHub::start().await;

    // when (操作):
    let result = hub.connect("mallory", "wrong", None).await;

    // then (期待する結果):
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
        other => panic!("expected 401, got {:?}", other.map(|_| ())),
    }
    assert!(hub.users().await.is_empty());
}

#[tokio::test]
async fn test_same_name_replaces_previous_session() {
    // テスト項目: 同じ表示名で接続すると古いセッションが 4000 で閉じられ、1 つだけ残る
    // given (前提条件):
    let hub = TestHub::start().await;
    let mut first = hub.join("alice").await;
    let first_id = hub.user_id("alice").await;

    // when (操作):
    let _second = hub.connect("alice", SECRET, None).await.unwrap();

    // then (期待する結果):
    assert_eq!(next_close_code(&mut first).await, Some(4000));
    let users = hub.users().await;
    assert_eq!(users.len(), 1);
    assert_ne!(users[0]["id"], first_id.as_str());
}

#[tokio::test]
async fn test_presence_notifications() {
    // テスト項目: 接続・切断が他の参加者に user-status として通知される
    // given (前提条件):
    let hub = TestHub::start().await;
    let mut alice = hub.join("alice").await;

    // when (操作):
    let mut bob = hub.join("bob").await;
    bob.close(None).await.unwrap();

    // then (期待する結果):
    let mut statuses = Vec::new();
    while statuses.len() < 2 {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, alice.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            let json: Value = serde_json::from_str(text.as_str()).unwrap();
            statuses.push((json["status"].clone(), json["user"]["name"].clone()));
        }
    }
    assert_eq!(
        statuses,
        vec![
            (json!("online"), json!("bob")),
            (json!("offline"), json!("bob"))
        ]
    );
}

#[tokio::test]
async fn test_target_routing() {
    // テスト項目: "me" は送信者本人に、複数指定は名前・ID の一致者にだけ届く
    // given (前提条件):
    let hub = TestHub::start().await;
    let mut alice = hub.join("alice").await;
    let mut bob = hub.join("bob").await;
    let mut carol = hub.join("carol").await;
    let carol_id = hub.user_id("carol").await;

    // when (操作):
    send_frame(
        &mut alice,
        json!({"type": "toast", "message": "just me", "target": "me", "sender": "bob"}),
    )
    .await;
    let response = hub
        .broadcast(json!({"type": "hamster", "target": ["BOB", carol_id.to_uppercase()]}))
        .await;

    // then (期待する結果):
    assert_eq!(response.json::<Value>().await.unwrap()["sent"], 2);

    let toast = next_event(&mut alice).await.unwrap();
    assert_eq!(toast["message"], "just me");
    assert_eq!(toast["sender"], "alice");
    assert_eq!(toast["recipientInfo"], "to everyone");

    assert_eq!(next_event(&mut bob).await.unwrap()["type"], "hamster");
    assert_eq!(next_event(&mut carol).await.unwrap()["type"], "hamster");

    send_marker(&hub, "alice").await;
    assert_eq!(next_event(&mut alice).await.unwrap()["variant"], "marker");
}

#[tokio::test]
async fn test_all_reaches_everyone_and_redelivery_is_not_deduplicated() {
    // テスト項目: "all" は全員に届き、同じイベントを 2 回送ると 2 回届く
    // given (前提条件):
    let hub = TestHub::start().await;
    let mut alice = hub.join("alice").await;
    let mut bob = hub.join("bob").await;
    let body = json!({"type": "toast", "message": "hello", "target": "all", "severity": "success"});

    // when (操作):
    let first = hub.broadcast(body.clone()).await;
    let second = hub.broadcast(body).await;

    // then (期待する結果):
    assert_eq!(first.json::<Value>().await.unwrap()["sent"], 2);
    assert_eq!(second.json::<Value>().await.unwrap()["sent"], 2);
    for ws in [&mut alice, &mut bob] {
        let a = next_event(ws).await.unwrap();
        let b = next_event(ws).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a["severity"], "success");
        assert!(a.get("senderId").is_none());
    }
}

#[tokio::test]
async fn test_reaction_is_relayed_to_one_participant() {
    // テスト項目: リアクションは対象の 1 人にだけ届き、fromUser は送信者の接続名になる
    // given (前提条件):
    let hub = TestHub::start().await;
    let mut alice = hub.join("alice").await;
    let mut bob = hub.join("bob").await;
    let alice_id = hub.user_id("alice").await;

    // when (操作):
    send_frame(
        &mut alice,
        json!({"type": "reaction", "targetUserId": "bob", "reaction": "love", "fromUser": "someone"}),
    )
    .await;

    // then (期待する結果):
    let reaction = next_event(&mut bob).await.unwrap();
    assert_eq!(reaction["type"], "reaction");
    assert_eq!(reaction["fromUser"], "alice");
    assert_eq!(reaction["fromUserId"], alice_id.as_str());
    assert_eq!(reaction["reaction"], "love");

    send_marker(&hub, "alice").await;
    assert_eq!(next_event(&mut alice).await.unwrap()["variant"], "marker");
}

#[tokio::test]
async fn test_update_name_changes_listing() {
    // テスト項目: update-name で一覧上の表示名が変わる
    // given (前提条件):
    let hub = TestHub::start().await;
    let mut ws = hub.join("alice").await;

    // when (操作):
    send_frame(&mut ws, json!({"type": "update-name", "name": "  Alicia  "})).await;

    // then (期待する結果):
    hub.wait_for_user("Alicia", 1).await;
    assert_eq!(hub.users().await.len(), 1);
}

#[tokio::test]
async fn test_broadcast_schema_is_enforced() {
    // テスト項目: 範囲外・未知の値を含むイベントは 400 で拒否される
    // given (前提条件):
    let hub = TestHub::start().await;
    let invalid = [
        json!({"type": "toast", "message": "x".repeat(281)}),
        json!({"type": "hamster", "duration": 50000}),
        json!({"type": "toast", "message": "hi", "severity": "unknown"}),
        json!({"type": "reaction", "targetUserId": "a", "reaction": "love", "fromUser": "b"}),
    ];

    for body in invalid {
        // when (操作):
        let response = hub.broadcast(body.clone()).await;

        // then (期待する結果):
        assert_eq!(response.status(), 400, "body: {body}");
        assert!(response.json::<Value>().await.unwrap()["error"].is_string());
    }
}

#[tokio::test]
async fn test_invalid_frames_are_dropped_silently() {
    // テスト項目: スキーマ違反・不正な JSON のフレームは無言で破棄され、接続は維持される
    // given (前提条件):
    let hub = TestHub::start().await;
    let mut alice = hub.join("alice").await;
    let mut bob = hub.join("bob").await;

    // when (操作):
    for frame in [
        json!({"type": "toast", "message": "x".repeat(281)}).to_string(),
        json!({"type": "hamster", "duration": 50000}).to_string(),
        json!({"type": "toast", "message": "hi", "severity": "unknown"}).to_string(),
        "not json".to_string(),
    ] {
        alice.send(Message::Text(frame.into())).await.unwrap();
    }
    send_frame(
        &mut alice,
        json!({"type": "hamster", "variant": "after", "target": "me"}),
    )
    .await;

    // then (期待する結果): 同じ接続から後に送った正しいフレームが最初に届く
    let first = next_event(&mut alice).await.unwrap();
    assert_eq!(first["variant"], "after");
    assert_eq!(first["sender"], "alice");

    send_marker(&hub, "bob").await;
    assert_eq!(next_event(&mut bob).await.unwrap()["variant"], "marker");

    send_marker(&hub, "alice").await;
    assert_eq!(next_event(&mut alice).await.unwrap()["variant"], "marker");
    assert_eq!(hub.users().await.len(), 2);
}

#[tokio::test]
async fn test_broadcast_rate_limit() {
    // テスト項目: /broadcast は 10 秒あたり 10 回を超えると 429
    // given (前提条件):
    let hub = TestHub::start().await;

    // when (操作):
    let mut statuses = Vec::new();
    for _ in 0..11 {
        statuses.push(hub.broadcast(json!({"type": "hamster"})).await.status());
    }

    // then (期待する結果):
    assert!(statuses[..10].iter().all(|s| *s == 200));
    assert_eq!(statuses[10], 429);
}

#[tokio::test]
async fn test_connection_rate_limit_drops_excess_frames() {
    // テスト項目: 1 接続あたり 10 秒に 5 件を超えるイベントは破棄される
    // given (前提条件):
    let hub = TestHub::start().await;
    let mut alice = hub.join("alice").await;

    // when (操作):
    for i in 0..7 {
        send_frame(
            &mut alice,
            json!({"type": "hamster", "variant": format!("v{i}"), "target": "me"}),
        )
        .await;
    }

    // then (期待する結果): タイムアウトまでに届いた分だけ集める
    let mut variants = Vec::new();
    while let Some(event) = next_event(&mut alice).await {
        variants.push(event["variant"].as_str().unwrap().to_string());
    }
    assert_eq!(variants, vec!["v0", "v1", "v2", "v3", "v4"]);
}

#[tokio::test]
async fn test_invite_token_is_bound_to_owner() {
    // テスト項目: 招待コードで得たトークンはオーナー u1 では使え、u2 では拒否される
    // given (前提条件):
    let hub = TestHub::start_with(HubConfig {
        invite_codes: vec!["welcome".to_string()],
        ..Default::default()
    })
    .await;

    // when (操作):
    let response = hub
        .http
        .post(hub.url("/invite"))
        .json(&json!({"inviteCode": "welcome", "ownerId": "u1", "deviceId": "laptop"}))
        .send()
        .await
        .unwrap();
    let token = response.json::<Value>().await.unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();

    // then (期待する結果):
    let check = |owner: &'static str| {
        hub.http
            .get(hub.url("/auth-check"))
            .bearer_auth(&token)
            .header("x-client-user", owner)
            .send()
    };
    assert_eq!(check("u1").await.unwrap().status(), 200);
    assert_eq!(check("u2").await.unwrap().status(), 401);

    assert!(hub.connect("alice", &token, Some("u1")).await.is_ok());
    match hub.connect("mallory", &token, Some("u2")).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
        other => panic!("expected 401, got {:?}", other.map(|_| ())),
    }

    // 招待システム有効後は共有シークレットが使えない
    let legacy = hub.http.get(hub.url("/auth-check")).bearer_auth(SECRET).send();
    assert_eq!(legacy.await.unwrap().status(), 401);
}

#[tokio::test]
async fn test_invite_errors() {
    // テスト項目: 招待コード不一致は 403、ownerId 欠落は 400、無効時は本文に関わらず 403
    // given (前提条件):
    let enabled = TestHub::start_with(HubConfig {
        invite_codes: vec!["welcome".to_string()],
        ..Default::default()
    })
    .await;
    let disabled = TestHub::start().await;
    let post = |hub: &TestHub, body: Value| hub.http.post(hub.url("/invite")).json(&body).send();

    // when (操作):
    let wrong_code = post(&enabled, json!({"inviteCode": "nope", "ownerId": "u1"})).await;
    let no_owner = post(&enabled, json!({"inviteCode": "welcome", "ownerId": ""})).await;
    let off = post(&disabled, json!({"inviteCode": "welcome", "ownerId": "u1"})).await;
    let off_malformed = disabled
        .http
        .post(disabled.url("/invite"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await;

    // then (期待する結果):
    assert_eq!(wrong_code.unwrap().status(), 403);
    assert_eq!(no_owner.unwrap().status(), 400);
    assert_eq!(off.unwrap().status(), 403);
    assert_eq!(off_malformed.unwrap().status(), 403);
}

#[tokio::test]
async fn test_admin_revocation_closes_sessions() {
    // テスト項目: prefix で失効させるとトークンは無効になり、接続中のセッションが 4001 で閉じられる
    // given (前提条件):
    let hub = TestHub::start_with(HubConfig {
        invite_codes: vec!["welcome".to_string()],
        ..Default::default()
    })
    .await;
    let token = hub
        .http
        .post(hub.url("/invite"))
        .json(&json!({"inviteCode": "welcome", "ownerId": "u1"}))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();
    let mut ws = hub.connect("alice", &token, Some("u1")).await.unwrap();

    let listing: Value = hub
        .http
        .get(hub.url("/tokens"))
        .header("x-admin-token", ADMIN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let prefix = listing["tokens"][0]["prefix"].as_str().unwrap().to_string();
    assert_eq!(prefix, &token[..8]);
    assert_eq!(listing["tokens"][0]["ownerId"], "u1");
    assert!(listing.to_string().find(&token).is_none());

    // 登録完了を待つ（トークンの所有者として一覧を読む）
    for _ in 0..40 {
        let users: Value = hub
            .http
            .get(hub.url("/users"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if users["users"].as_array().is_some_and(|u| !u.is_empty()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    // when (操作):
    let revoked: Value = hub
        .http
        .delete(hub.url(&format!("/revoke/{prefix}")))
        .bearer_auth(ADMIN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(revoked, json!({"revoked": prefix, "closed": 1}));
    assert_eq!(next_close_code(&mut ws).await, Some(4001));
    let check = hub
        .http
        .get(hub.url("/auth-check"))
        .bearer_auth(&token)
        .header("x-client-user", "u1")
        .send()
        .await
        .unwrap();
    assert_eq!(check.status(), 401);
}

#[tokio::test]
async fn test_admin_routes_require_admin_credential() {
    // テスト項目: 管理者トークンが無い・誤っている場合は 401
    // given (前提条件):
    let hub = TestHub::start().await;

    // when (操作):
    let without = hub.http.get(hub.url("/tokens")).send().await.unwrap();
    let wrong = hub
        .http
        .get(hub.url("/tokens"))
        .bearer_auth(SECRET)
        .send()
        .await
        .unwrap();
    let missing_token = hub
        .http
        .delete(hub.url("/revoke/deadbeef"))
        .header("x-admin-token", ADMIN)
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(without.status(), 401);
    assert_eq!(wrong.status(), 401);
    assert_eq!(missing_token.status(), 404);
}
