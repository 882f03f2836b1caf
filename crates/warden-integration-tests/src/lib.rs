//! Shared fixtures for warden integration tests.
//!
//! [`MockNetwork`] is an in-process stand-in for the network management API.
//! It keeps member state between requests, so a tag update accepted in one
//! pass is visible to the next.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use warden_ztapi::ZtApiClient;

/// Credential the mock accepts.
pub const TOKEN: &str = "integration-token";

/// Network id served by the mock.
pub const NETWORK_ID: &str = "8056c2e21c000001";

/// Status tag id in the mock schema.
pub const STATUS_TAG_ID: u32 = 1;
/// `allowed` enum value.
pub const ALLOWED: u32 = 0;
/// `blocked` enum value.
pub const BLOCKED: u32 = 1;

#[derive(Default)]
struct MockState {
    members: BTreeMap<String, Value>,
    unauthorized: bool,
    members_down: bool,
    vanished: BTreeSet<String>,
    rejecting: BTreeSet<String>,
    posted: Vec<(String, Value)>,
}

/// Handle to a running mock API server.
#[derive(Clone)]
pub struct MockNetwork {
    base_url: String,
    state: Arc<Mutex<MockState>>,
}

/// A member descriptor as the API returns it.
pub fn member_json(id: &str, address: &str, last_seen_secs: u64, status: u32) -> Value {
    json!({
        "config": {"id": id, "tags": [[STATUS_TAG_ID, status]]},
        "physicalAddress": format!("{address}/9993"),
        "lastSeen": last_seen_secs * 1000,
    })
}

impl MockNetwork {
    /// Serve `members` on an ephemeral local port.
    pub async fn start(members: Vec<Value>) -> Self {
        let state = MockState {
            members: members
                .into_iter()
                .filter_map(|m| {
                    let id = m["config"]["id"].as_str()?.to_string();
                    Some((id, m))
                })
                .collect(),
            ..MockState::default()
        };
        let state = Arc::new(Mutex::new(state));

        let app = Router::new()
            .route("/api/v1/network/:network_id", get(get_network))
            .route("/api/v1/network/:network_id/member", get(get_members))
            .route(
                "/api/v1/network/:network_id/member/:member_id",
                get(get_member).post(post_member),
            )
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock");
        let addr = listener.local_addr().expect("mock addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock");
        });

        Self {
            base_url: format!("http://{addr}/api/v1"),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client holding the accepted credential.
    pub fn client(&self) -> ZtApiClient {
        self.client_with_token(TOKEN)
    }

    pub fn client_with_token(&self, token: &str) -> ZtApiClient {
        ZtApiClient::new(token, self.base_url.as_str(), Duration::from_secs(2)).expect("client")
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state")
    }

    /// Reject every request with 401.
    pub fn set_unauthorized(&self, unauthorized: bool) {
        self.lock().unauthorized = unauthorized;
    }

    /// Fail the member listing with 500 while the network stays readable.
    pub fn set_members_down(&self, down: bool) {
        self.lock().members_down = down;
    }

    /// Keep a member in the listing but answer 404 for it individually.
    pub fn vanish(&self, member_id: &str) {
        self.lock().vanished.insert(member_id.to_string());
    }

    /// Answer 500 to tag updates for a member.
    pub fn reject_tags(&self, member_id: &str) {
        self.lock().rejecting.insert(member_id.to_string());
    }

    /// Accepted tag-update bodies, keyed by member id, in arrival order.
    pub fn posted(&self) -> Vec<(String, Value)> {
        self.lock().posted.clone()
    }

    /// Current tag list of a member.
    pub fn tags(&self, member_id: &str) -> Value {
        self.lock()
            .members
            .get(member_id)
            .map(|m| m["config"]["tags"].clone())
            .unwrap_or(Value::Null)
    }
}

type Shared = State<Arc<Mutex<MockState>>>;

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    !state.unauthorized
        && headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("token {TOKEN}"))
}

async fn get_network(
    State(state): Shared,
    headers: HeaderMap,
    Path(network_id): Path<String>,
) -> Response {
    let state = state.lock().expect("mock state");
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "id": network_id,
        "tagsByName": {
            "status": {
                "id": STATUS_TAG_ID,
                "default": ALLOWED,
                "enums": {"allowed": ALLOWED, "blocked": BLOCKED}
            },
            "class": {"id": 2, "enums": {"player": 7, "host": 8}}
        }
    }))
    .into_response()
}

async fn get_members(State(state): Shared, headers: HeaderMap) -> Response {
    let state = state.lock().expect("mock state");
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.members_down {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(state.members.values().cloned().collect::<Vec<_>>()).into_response()
}

async fn get_member(
    State(state): Shared,
    headers: HeaderMap,
    Path((_, member_id)): Path<(String, String)>,
) -> Response {
    let state = state.lock().expect("mock state");
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.vanished.contains(&member_id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    match state.members.get(&member_id) {
        Some(member) => Json(member.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn post_member(
    State(state): Shared,
    headers: HeaderMap,
    Path((_, member_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().expect("mock state");
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.rejecting.contains(&member_id) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let tags = body["config"]["tags"].clone();
    let Some(member) = state.members.get_mut(&member_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    member["config"]["tags"] = tags;
    let updated = member.clone();
    state.posted.push((member_id, body));
    Json(updated).into_response()
}
