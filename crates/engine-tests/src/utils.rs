use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use engine_core::{retry::RetryPolicy, settings::PipelineSettings};
use model::records::result::InferenceResult;
use serde_json::{Value, json};
use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

/// Mock inference endpoint. Echoes the body it receives under `echo`, except
/// for bodies carrying `"fail": true`, which always get a 503.
#[derive(Clone, Default)]
pub struct MockEndpoint {
    received: Arc<Mutex<Vec<Value>>>,
    delay: Duration,
}

impl MockEndpoint {
    pub async fn start() -> (Self, String) {
        Self::start_with_delay(Duration::ZERO).await
    }

    /// Like `start`, but every response is held back by `delay`.
    pub async fn start_with_delay(delay: Duration) -> (Self, String) {
        let endpoint = Self {
            delay,
            ..Self::default()
        };
        let app = Router::new()
            .route("/v1/completions", post(handle))
            .with_state(endpoint.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock endpoint");
        let addr = listener.local_addr().expect("mock endpoint address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock endpoint");
        });

        (endpoint, format!("http://{addr}/v1/completions"))
    }

    /// Every body the endpoint was sent, retries included.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().expect("mock endpoint lock").clone()
    }
}

async fn handle(State(endpoint): State<MockEndpoint>, Json(body): Json<Value>) -> impl IntoResponse {
    endpoint
        .received
        .lock()
        .expect("mock endpoint lock")
        .push(body.clone());

    if !endpoint.delay.is_zero() {
        tokio::time::sleep(endpoint.delay).await;
    }

    if body.get("fail") == Some(&Value::Bool(true)) {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "model overloaded"));
    }
    Ok(Json(json!({ "echo": body })))
}

pub fn settings(
    url: &str,
    requests_path: &str,
    output_path: &str,
    flush_every: usize,
    concurrency: usize,
) -> PipelineSettings {
    PipelineSettings::builder(requests_path)
        .url(url)
        .output_path(output_path)
        .flush_every(flush_every)
        .concurrency(concurrency)
        .retry(RetryPolicy::immediate(3))
        .build()
        .expect("valid test settings")
}

/// `count` requests of the form `{"id": n, "title": "title n"}`, one per line.
pub fn request_lines(count: usize) -> String {
    (0..count)
        .map(|n| json!({ "id": n, "title": format!("title {n}") }).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn write_requests(path: &Path, content: &str) {
    std::fs::write(path, content).expect("write requests file");
}

/// Partition files in `dir`, ordered by partition number, with their
/// decoded results.
pub fn read_partitions(dir: &Path) -> Vec<(String, Vec<InferenceResult>)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<(u64, String)> = entries
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .filter_map(|name| {
            let n = name.strip_prefix("part-")?.strip_suffix(".jsonl")?.parse().ok()?;
            Some((n, name))
        })
        .collect();
    files.sort();

    files
        .into_iter()
        .map(|(_, name)| {
            let content = std::fs::read_to_string(dir.join(&name)).expect("read partition");
            (name, parse_partition(&content))
        })
        .collect()
}

pub fn parse_partition(content: &str) -> Vec<InferenceResult> {
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("partition line is a result"))
        .collect()
}

/// `id` of every result, sorted.
pub fn result_ids<'a>(results: impl IntoIterator<Item = &'a InferenceResult>) -> Vec<u64> {
    let mut ids: Vec<u64> = results
        .into_iter()
        .filter_map(|result| result.request().get("id")?.as_u64())
        .collect();
    ids.sort_unstable();
    ids
}
