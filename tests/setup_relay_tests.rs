//! Setup and Relay Integration Tests
//!
//! These tests drive the setup handshake and the command relay against an
//! in-memory store and a local mock of the Oxford API, with call counters to
//! verify that unconfigured guilds never reach the remote endpoint.
//!
//! Run with: `cargo test --test setup_relay_tests`

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use oxbot::database::{Database, GuildConfig};
use oxbot::error::RelayError;
use oxbot::oxford::OxfordClient;
use oxbot::relay::{CommandRelay, GameAction};
use oxbot::setup::{SetupCoordinator, SetupRequest};

const SERVER_ID: &str = "srv-42";
const API_KEY: &str = "key-abc";

// ============================================================================
// Mock Oxford API
// ============================================================================

struct MockOxford {
    info_calls: AtomicUsize,
    command_calls: AtomicUsize,
    last_command: Mutex<Option<String>>,
    /// Status and raw body returned by the command endpoint.
    command_reply: Mutex<(u16, String)>,
}

impl MockOxford {
    fn new() -> Self {
        MockOxford {
            info_calls: AtomicUsize::new(0),
            command_calls: AtomicUsize::new(0),
            last_command: Mutex::new(None),
            command_reply: Mutex::new((200, r#"{"message":"Success"}"#.to_string())),
        }
    }

    async fn set_command_reply(&self, status: u16, body: &str) {
        *self.command_reply.lock().await = (status, body.to_string());
    }
}

fn key_ok(headers: &HeaderMap) -> bool {
    headers
        .get("server-key")
        .and_then(|value| value.to_str().ok())
        == Some(API_KEY)
}

async fn server_info(
    State(state): State<Arc<MockOxford>>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    state.info_calls.fetch_add(1, Ordering::SeqCst);

    if !key_ok(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            r#"{"error":"invalid server key"}"#.to_string(),
        );
    }

    let body = serde_json::json!({
        "Name": "Box",
        "CurrentPlayers": 3,
        "MaxPlayers": 10,
        "JoinCode": "ABCD",
        "OwnerId": "u0",
    });
    (StatusCode::OK, body.to_string())
}

async fn server_command(
    State(state): State<Arc<MockOxford>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, String) {
    state.command_calls.fetch_add(1, Ordering::SeqCst);

    if !key_ok(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            r#"{"error":"invalid server key"}"#.to_string(),
        );
    }

    let command = body["command"].as_str().unwrap_or_default().to_string();
    *state.last_command.lock().await = Some(command);

    let (status, reply) = state.command_reply.lock().await.clone();
    (StatusCode::from_u16(status).unwrap(), reply)
}

/// Spawns the mock on an ephemeral port, returns its base URL and state.
async fn spawn_mock() -> (String, Arc<MockOxford>) {
    let state = Arc::new(MockOxford::new());
    let app = Router::new()
        .route("/v1/server", get(server_info))
        .route("/v1/server/command", post(server_command))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

fn setup_request(guild_id: &str) -> SetupRequest {
    SetupRequest {
        guild_id: guild_id.to_string(),
        server_id: SERVER_ID.to_string(),
        api_key: API_KEY.to_string(),
        log_channel_id: Some("chan-9".to_string()),
        requester_id: "user-1".to_string(),
    }
}

async fn test_fixture() -> (Database, SetupCoordinator, CommandRelay, Arc<MockOxford>) {
    let (base_url, mock) = spawn_mock().await;
    let database = Database::new(":memory:").await.unwrap();
    let oxford = OxfordClient::with_base_url(base_url).unwrap();
    let coordinator = SetupCoordinator::new(database.clone(), oxford.clone());
    let relay = CommandRelay::new(database.clone(), oxford);
    (database, coordinator, relay, mock)
}

// ============================================================================
// Store Tests
// ============================================================================

/// The conditional insert writes at most one row per guild; a second insert
/// reports failure and leaves the first row unchanged.
#[tokio::test]
async fn conditional_insert_writes_at_most_once() {
    let database = Database::new(":memory:").await.unwrap();

    let first = GuildConfig {
        guild_id: "G1".to_string(),
        server_id: SERVER_ID.to_string(),
        api_key: API_KEY.to_string(),
        log_channel_id: None,
        setup_by: "user-1".to_string(),
        setup_at: Utc::now(),
    };
    assert!(database.insert_guild_config(&first).await.unwrap());

    let second = GuildConfig {
        server_id: "srv-other".to_string(),
        ..first.clone()
    };
    assert!(!database.insert_guild_config(&second).await.unwrap());

    let stored = database.get_guild_config("G1").await.unwrap().unwrap();
    assert_eq!(stored, first);
}

// ============================================================================
// Setup Flow Tests
// ============================================================================

/// Validated credentials are persisted exactly as given, with provenance.
#[tokio::test]
async fn setup_persists_validated_config() {
    let (database, coordinator, _relay, _mock) = test_fixture().await;
    let start = Utc::now();

    let info = coordinator.setup(setup_request("G1")).await.unwrap();
    assert_eq!(info.name, "Box");
    assert_eq!(info.current_players, 3);
    assert_eq!(info.max_players, 10);
    assert_eq!(info.join_code, "ABCD");
    assert_eq!(info.owner_id, "u0");

    let stored = database.get_guild_config("G1").await.unwrap().unwrap();
    assert_eq!(stored.guild_id, "G1");
    assert_eq!(stored.server_id, SERVER_ID);
    assert_eq!(stored.api_key, API_KEY);
    assert_eq!(stored.log_channel_id, Some("chan-9".to_string()));
    assert_eq!(stored.setup_by, "user-1");
    assert!(stored.setup_at >= start);
}

/// The second setup is rejected without touching the remote API, and the
/// stored config is the one the first call wrote.
#[tokio::test]
async fn second_setup_is_rejected() {
    let (database, coordinator, _relay, mock) = test_fixture().await;

    coordinator.setup(setup_request("G1")).await.unwrap();
    let first = database.get_guild_config("G1").await.unwrap().unwrap();

    let mut again = setup_request("G1");
    again.server_id = "srv-other".to_string();
    let err = coordinator.setup(again).await.unwrap_err();
    assert!(matches!(err, RelayError::AlreadyConfigured));

    // Only the first call validated against the API.
    assert_eq!(mock.info_calls.load(Ordering::SeqCst), 1);

    let after = database.get_guild_config("G1").await.unwrap().unwrap();
    assert_eq!(after, first);
}

/// Failed validation persists nothing.
#[tokio::test]
async fn failed_validation_persists_nothing() {
    let (database, coordinator, _relay, mock) = test_fixture().await;

    let mut request = setup_request("G1");
    request.api_key = "wrong-key".to_string();
    let err = coordinator.setup(request).await.unwrap_err();
    assert!(matches!(err, RelayError::ValidationFailed(_)));

    assert_eq!(mock.info_calls.load(Ordering::SeqCst), 1);
    assert!(database.get_guild_config("G1").await.unwrap().is_none());
}

/// Two concurrent setups for the same guild: exactly one wins, the loser
/// sees AlreadyConfigured, and exactly one record is persisted.
#[tokio::test]
async fn concurrent_setup_has_single_winner() {
    let (base_url, _mock) = spawn_mock().await;
    let database = Database::new(":memory:").await.unwrap();
    let oxford = OxfordClient::with_base_url(base_url).unwrap();

    let first = SetupCoordinator::new(database.clone(), oxford.clone());
    let second = SetupCoordinator::new(database.clone(), oxford);

    let mut request_a = setup_request("G1");
    request_a.server_id = "srv-a".to_string();
    let mut request_b = setup_request("G1");
    request_b.server_id = "srv-b".to_string();

    let (result_a, result_b) = tokio::join!(first.setup(request_a), second.setup(request_b));

    let outcomes = [("srv-a", &result_a), ("srv-b", &result_b)];
    let winners: Vec<&str> = outcomes
        .iter()
        .filter(|(_, result)| result.is_ok())
        .map(|(server_id, _)| *server_id)
        .collect();
    assert_eq!(winners.len(), 1, "exactly one setup call must win");

    for (_, result) in &outcomes {
        if let Err(e) = result {
            assert!(
                matches!(e, RelayError::AlreadyConfigured),
                "loser must see AlreadyConfigured, got: {e}"
            );
        }
    }

    let stored = database
        .get_guild_config("G1")
        .await
        .unwrap()
        .expect("exactly one record must persist");
    assert_eq!(stored.server_id, winners[0]);
}

// ============================================================================
// Command Relay Tests
// ============================================================================

/// An unconfigured guild never reaches the remote command endpoint.
#[tokio::test]
async fn relay_on_unconfigured_guild_never_calls_api() {
    let (_database, _coordinator, relay, mock) = test_fixture().await;

    let action = GameAction::Ban {
        username: "alice".to_string(),
        reason: "cheating".to_string(),
    };
    let err = relay.relay("G-unknown", &action).await.unwrap_err();
    assert!(matches!(err, RelayError::NotConfigured));

    assert_eq!(mock.command_calls.load(Ordering::SeqCst), 0);
}

/// The relay sends the built command string with the guild's credentials and
/// returns the parsed response.
#[tokio::test]
async fn relay_sends_built_command_string() {
    let (_database, coordinator, relay, mock) = test_fixture().await;
    coordinator.setup(setup_request("G1")).await.unwrap();

    let action = GameAction::Ban {
        username: "alice".to_string(),
        reason: "cheating".to_string(),
    };
    let outcome = relay.relay("G1", &action).await.unwrap();
    assert_eq!(outcome.command, "ban alice cheating");
    assert_eq!(outcome.response.message, "Success");
    assert_eq!(outcome.log_channel_id, Some("chan-9".to_string()));
    assert_eq!(
        mock.last_command.lock().await.as_deref(),
        Some("ban alice cheating")
    );

    let action = GameAction::Run {
        command: "time 12".to_string(),
    };
    let outcome = relay.relay("G1", &action).await.unwrap();
    assert_eq!(outcome.command, "time 12");
    assert_eq!(mock.last_command.lock().await.as_deref(), Some("time 12"));

    assert_eq!(mock.command_calls.load(Ordering::SeqCst), 2);
}

/// A 500 with a non-JSON body surfaces as RemoteError and the stored config
/// is unaffected.
#[tokio::test]
async fn remote_failure_surfaces_as_remote_error() {
    let (database, coordinator, relay, mock) = test_fixture().await;
    coordinator.setup(setup_request("G1")).await.unwrap();
    let before = database.get_guild_config("G1").await.unwrap().unwrap();

    mock.set_command_reply(500, "Internal Server Error").await;

    let action = GameAction::Kick {
        username: "bob".to_string(),
        reason: "afk".to_string(),
    };
    let err = relay.relay("G1", &action).await.unwrap_err();
    match err {
        RelayError::RemoteError { status, .. } => assert_eq!(status, Some(500)),
        other => panic!("expected RemoteError, got: {other}"),
    }

    let after = database.get_guild_config("G1").await.unwrap().unwrap();
    assert_eq!(after, before);
}

/// A 2xx body that is not the expected JSON shape is InvalidResponse.
#[tokio::test]
async fn unparseable_success_body_is_invalid_response() {
    let (_database, coordinator, relay, mock) = test_fixture().await;
    coordinator.setup(setup_request("G1")).await.unwrap();

    mock.set_command_reply(200, "pong").await;

    let action = GameAction::Run {
        command: "ping".to_string(),
    };
    let err = relay.relay("G1", &action).await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidResponse(_)));
}
