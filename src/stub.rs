//! In-process HTTP server replaying canned responses, used by the tests.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

#[derive(Clone, Debug)]
pub(crate) enum Reply {
    Json { status: u16, body: String },
    /// Accept the request and never answer.
    Hang,
}

impl Reply {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self::Json {
            status,
            body: body.into(),
        }
    }

    pub fn success(data: serde_json::Value) -> Self {
        Self::json(
            200,
            serde_json::json!({ "status": "success", "data": data }).to_string(),
        )
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    #[allow(dead_code)]
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Decoded query string parameter.
    pub fn param(&self, name: &str) -> Option<String> {
        let url = reqwest::Url::parse(&format!("http://stub{}", self.uri)).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

#[derive(Default)]
struct Recorder {
    replies: VecDeque<Reply>,
    requests: Vec<RecordedRequest>,
}

impl Recorder {
    // the last reply is kept for every following request
    fn next_reply(&mut self) -> Reply {
        if self.replies.len() > 1 {
            self.replies.pop_front().unwrap_or(Reply::Hang)
        } else {
            self.replies.front().cloned().unwrap_or(Reply::Hang)
        }
    }
}

type SharedRecorder = Arc<Mutex<Recorder>>;

fn record(recorder: &SharedRecorder, request: RecordedRequest) -> Reply {
    match recorder.lock() {
        Ok(mut inner) => {
            inner.requests.push(request);
            inner.next_reply()
        }
        Err(_) => Reply::json(500, "stub recorder poisoned"),
    }
}

async fn handle(
    State(recorder): State<SharedRecorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let reply = record(
        &recorder,
        RecordedRequest {
            method,
            uri,
            headers,
            body,
        },
    );
    match reply {
        Reply::Json { status, body } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

pub(crate) struct StubServer {
    address: SocketAddr,
    recorder: SharedRecorder,
    _handle: tokio::task::JoinHandle<()>,
}

impl StubServer {
    pub async fn start(replies: impl IntoIterator<Item = Reply>) -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let address = listener.local_addr().unwrap();
        let recorder = Arc::new(Mutex::new(Recorder {
            replies: replies.into_iter().collect(),
            requests: Vec::new(),
        }));
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&recorder));
        let _handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!("stub server failed: {err:?}");
            }
        });
        Self {
            address,
            recorder,
            _handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// Same as [`Self::base_url`] with credentials in the authority.
    pub fn base_url_with_credentials(&self, username: &str, password: &str) -> String {
        format!("http://{username}:{password}@{}", self.address)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorder
            .lock()
            .map_or_else(|_| Vec::new(), |inner| inner.requests.clone())
    }
}

/// Returns an address nothing listens on.
pub(crate) async fn unused_address() -> SocketAddr {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    listener.local_addr().unwrap()
}
