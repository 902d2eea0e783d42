//! Mock catalog server lifecycle management
//!
//! Each test spawns its own server on a random port. Responses are scripted
//! per request key: every hit pops the next scripted `(status, body)`, and the
//! last one keeps repeating. Unscripted keys answer 404.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const API_PREFIX: &str = "/xmlapi2";

#[derive(Default)]
struct MockState {
    scripts: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
    hits: Mutex<HashMap<String, usize>>,
    headers: Mutex<Vec<HeaderMap>>,
}

impl MockState {
    fn respond(&self, key: String, headers: HeaderMap) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
        self.headers.lock().unwrap().push(headers);
        *self.hits.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

        let mut scripts = self.scripts.lock().unwrap();
        let (status, body) = match scripts.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => (404, String::from("<error>not found</error>")),
        };

        (
            StatusCode::from_u16(status).unwrap(),
            [(header::CONTENT_TYPE, "application/xml")],
            body,
        )
    }
}

/// Mock catalog instance
///
/// When dropped, the server shuts down.
pub struct MockCatalog {
    /// Base URL of the server (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    state: Arc<MockState>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockCatalog {
    /// Spawns a new mock catalog on a random port.
    ///
    /// The listener is bound before this returns, so requests made right
    /// after are queued rather than refused.
    pub async fn spawn() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route(&format!("{}/search", API_PREFIX), get(search))
            .route(&format!("{}/thing", API_PREFIX), get(thing))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Value for `api_base`.
    pub fn api_base(&self) -> String {
        format!("{}{}", self.base_url, API_PREFIX)
    }

    pub fn script_search(&self, query: &str, responses: Vec<(u16, String)>) {
        self.script(search_key(query), responses);
    }

    pub fn script_item(&self, id: u64, responses: Vec<(u16, String)>) {
        self.script(item_key(id), responses);
    }

    pub fn script_version(&self, version_id: u64, responses: Vec<(u16, String)>) {
        self.script(version_key(version_id), responses);
    }

    pub fn search_hits(&self, query: &str) -> usize {
        self.hits(&search_key(query))
    }

    pub fn item_hits(&self, id: u64) -> usize {
        self.hits(&item_key(id))
    }

    pub fn version_hits(&self, version_id: u64) -> usize {
        self.hits(&version_key(version_id))
    }

    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().unwrap().values().sum()
    }

    /// Headers of every request received so far, in arrival order.
    pub fn received_headers(&self) -> Vec<HeaderMap> {
        self.state.headers.lock().unwrap().clone()
    }

    fn script(&self, key: String, responses: Vec<(u16, String)>) {
        self.state
            .scripts
            .lock()
            .unwrap()
            .insert(key, responses.into_iter().collect());
    }

    fn hits(&self, key: &str) -> usize {
        self.state.hits.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

impl Drop for MockCatalog {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn search_key(query: &str) -> String {
    format!("search:{}", query)
}

fn item_key(id: u64) -> String {
    format!("thing:{}", id)
}

fn version_key(version_id: u64) -> String {
    format!("version:{}", version_id)
}

async fn search(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl axum::response::IntoResponse {
    let query = params.get("query").cloned().unwrap_or_default();
    state.respond(search_key(&query), headers)
}

async fn thing(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl axum::response::IntoResponse {
    let id: u64 = params
        .get("id")
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    let key = match params.get("type").map(String::as_str) {
        Some("boardgameversion") => version_key(id),
        _ => item_key(id),
    };
    state.respond(key, headers)
}
