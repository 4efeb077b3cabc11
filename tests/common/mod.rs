//! Shared test utilities: stub backends and settings helpers.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use web_server::config::{QueueSettings, SearchSettings};
use web_server::Settings;

/// Settings with an in-memory SQLite database, an ephemeral port and nothing else configured.
pub fn sqlite_settings() -> Settings {
    let mut settings = Settings::default();
    settings.application.port = 0;
    settings.database.url = Some(SecretString::new("sqlite::memory:".into()));
    settings.lifecycle.release_timeout_secs = 5;
    settings
}

pub fn queue_settings(endpoint: &str, topic: &str) -> QueueSettings {
    QueueSettings {
        endpoint: endpoint.to_string(),
        topic: topic.to_string(),
        batch_size: 10,
        flush_interval_ms: 50,
        request_timeout_secs: 2,
    }
}

pub fn search_settings_with_credentials(
    endpoint: &str,
    username: &str,
    password: &str,
) -> SearchSettings {
    SearchSettings {
        username: Some(username.to_string()),
        password: Some(SecretString::new(password.to_string())),
        ..search_settings(endpoint)
    }
}

pub fn search_settings(endpoint: &str) -> SearchSettings {
    SearchSettings {
        endpoint: endpoint.to_string(),
        username: None,
        password: None,
        request_timeout_secs: 2,
    }
}

/// A port nothing is listening on.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Stub of a Kafka REST proxy serving a single topic.
#[derive(Clone)]
pub struct QueueProxyStub {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct QueueProxyState {
    topic: String,
    received: Arc<Mutex<Vec<Value>>>,
}

impl QueueProxyStub {
    pub async fn start(topic: &str) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = QueueProxyState {
            topic: topic.to_string(),
            received: received.clone(),
        };

        let router = Router::new()
            .route("/topics/{topic}", get(topic_metadata).post(produce))
            .with_state(state);

        Self {
            addr: serve(router).await,
            received,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Record values delivered so far.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

async fn topic_metadata(
    State(state): State<QueueProxyState>,
    Path(topic): Path<String>,
) -> (StatusCode, Json<Value>) {
    if topic == state.topic {
        (StatusCode::OK, Json(json!({ "name": topic, "partitions": [] })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error_code": 40401, "message": "Topic not found." })),
        )
    }
}

async fn produce(
    State(state): State<QueueProxyState>,
    Path(topic): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if topic != state.topic {
        return (StatusCode::NOT_FOUND, Json(json!({ "error_code": 40401 })));
    }

    let records = body["records"].as_array().cloned().unwrap_or_default();
    let offsets: Vec<Value> = records
        .iter()
        .map(|_| json!({ "partition": 0, "offset": 0 }))
        .collect();
    state
        .received
        .lock()
        .unwrap()
        .extend(records.into_iter().map(|r| r["value"].clone()));

    (StatusCode::OK, Json(json!({ "offsets": offsets })))
}

/// Stub of a search cluster keeping documents in memory.
#[derive(Clone)]
pub struct SearchStub {
    pub addr: SocketAddr,
    documents: Documents,
    authorizations: Arc<Mutex<Vec<String>>>,
}

impl SearchStub {
    pub async fn start() -> Self {
        let documents: Documents = Arc::new(Mutex::new(Vec::new()));
        let authorizations = Arc::new(Mutex::new(Vec::new()));

        let seen = authorizations.clone();
        let root = get(move |headers: HeaderMap| async move {
            if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
                seen.lock().unwrap().push(value.to_string());
            }
            Json(json!({ "version": { "number": "8.11.0" } }))
        });

        let router = Router::new()
            .route("/", root)
            .route("/{index}/_doc/{id}", put(index_document))
            .route("/{index}/_search", post(search))
            .with_state(documents.clone());

        Self {
            addr: serve(router).await,
            documents,
            authorizations,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    /// `Authorization` headers received on the cluster root.
    pub fn authorizations(&self) -> Vec<String> {
        self.authorizations.lock().unwrap().clone()
    }
}

type Documents = Arc<Mutex<Vec<(String, String, Value)>>>;

async fn index_document(
    State(documents): State<Documents>,
    Path((index, id)): Path<(String, String)>,
    Json(document): Json<Value>,
) -> (StatusCode, Json<Value>) {
    documents.lock().unwrap().push((index.clone(), id.clone(), document));
    (
        StatusCode::CREATED,
        Json(json!({ "_index": index, "_id": id, "result": "created" })),
    )
}

async fn search(
    State(documents): State<Documents>,
    Path(index): Path<String>,
) -> Json<Value> {
    let hits: Vec<Value> = documents
        .lock()
        .unwrap()
        .iter()
        .filter(|(i, _, _)| *i == index)
        .map(|(_, id, source)| json!({ "_id": id, "_source": source }))
        .collect();
    Json(json!({ "hits": { "total": { "value": hits.len() }, "hits": hits } }))
}

/// HTTP client that never routes through a proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
