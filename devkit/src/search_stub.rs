/*!
Search backend stub for development without a search service

Serves `POST /indexes/{index}/docs/search` on 127.0.0.1 with an ephemeral
port, answers with canned documents and records every query so tests can
assert on what the kernel asked for.
*/

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One query received by the stub.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub index: String,
    pub api_key: Option<String>,
    pub api_version: Option<String>,
    pub search: String,
    pub top: usize,
    pub query_type: String,
}

#[derive(Debug, Clone)]
enum Behaviour {
    Documents,
    Fail(u16),
    Delay(Duration),
}

#[derive(Debug)]
struct StubInner {
    documents: Vec<Value>,
    behaviour: Behaviour,
    queries: Vec<RecordedQuery>,
}

type StubState = Arc<Mutex<StubInner>>;

pub struct SearchStub {
    addr: SocketAddr,
    state: StubState,
    server: JoinHandle<()>,
}

impl SearchStub {
    /// Start the stub on an ephemeral local port.
    pub async fn start() -> Result<Self> {
        let _ = env_logger::try_init();

        let state: StubState = Arc::new(Mutex::new(StubInner {
            documents: Vec::new(),
            behaviour: Behaviour::Documents,
            queries: Vec::new(),
        }));

        let app = Router::new()
            .route("/indexes/{index}/docs/search", post(handle_search))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("[stub] search server stopped: {}", e);
            }
        });

        log::info!("[stub] search backend listening on {}", addr);
        Ok(Self { addr, state, server })
    }

    /// Base URL to use as the kernel's `search.endpoint`.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Documents returned (up to `top`) by the next queries.
    pub fn with_documents(&self, documents: Vec<Value>) -> &Self {
        let mut inner = self.state.lock().unwrap();
        inner.documents = documents;
        inner.behaviour = Behaviour::Documents;
        self
    }

    /// Answer every query with the given HTTP status.
    pub fn fail_with(&self, status: u16) -> &Self {
        self.state.lock().unwrap().behaviour = Behaviour::Fail(status);
        self
    }

    /// Hold every answer for `delay` before replying.
    pub fn delay(&self, delay: Duration) -> &Self {
        self.state.lock().unwrap().behaviour = Behaviour::Delay(delay);
        self
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().queries.clear();
    }
}

impl Drop for SearchStub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A hit in the shape the search service returns it.
pub fn search_document(title: &str, content: &str, source: &str, score: f64) -> Value {
    json!({
        "@search.score": score,
        "title": title,
        "content": content,
        "source": source,
    })
}

async fn handle_search(
    State(state): State<StubState>,
    Path(index): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let query = RecordedQuery {
        index,
        api_key: headers.get("api-key").and_then(|v| v.to_str().ok()).map(str::to_string),
        api_version: params.get("api-version").cloned(),
        search: body["search"].as_str().unwrap_or_default().to_string(),
        top: body["top"].as_u64().unwrap_or(50) as usize,
        query_type: body["queryType"].as_str().unwrap_or_default().to_string(),
    };
    let top = query.top;
    log::info!("[stub] query '{}' (top {})", query.search, top);

    let (behaviour, documents) = {
        let mut inner = state.lock().unwrap();
        inner.queries.push(query);
        (inner.behaviour.clone(), inner.documents.clone())
    };

    match behaviour {
        Behaviour::Fail(status) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({ "error": { "message": "stubbed failure" } }))).into_response()
        }
        Behaviour::Delay(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({ "value": take(documents, top) })).into_response()
        }
        Behaviour::Documents => Json(json!({ "value": take(documents, top) })).into_response(),
    }
}

fn take(documents: Vec<Value>, top: usize) -> Vec<Value> {
    documents.into_iter().take(top).collect()
}
