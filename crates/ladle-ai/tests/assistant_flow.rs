//! Adapter tests against a local mock of the provider API: polling
//! protocol, tool-output pass-through, unconditional thread cleanup, and
//! the single-round-trip image path.

use std::collections::VecDeque;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::{Value, json};

use ladle_ai::{GenerationError, GenerationRequest, OpenAiClient};

struct MockProvider {
    /// Run statuses handed out in order; the last one repeats.
    statuses: Mutex<VecDeque<String>>,
    chat_calls: AtomicUsize,
    tool_submissions: AtomicUsize,
    message_fetches: AtomicUsize,
    thread_deletes: AtomicUsize,
    last_tool_outputs: Mutex<Option<Value>>,
}

impl MockProvider {
    fn new(statuses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(statuses.iter().map(|s| s.to_string()).collect()),
            chat_calls: AtomicUsize::new(0),
            tool_submissions: AtomicUsize::new(0),
            message_fetches: AtomicUsize::new(0),
            thread_deletes: AtomicUsize::new(0),
            last_tool_outputs: Mutex::new(None),
        })
    }

    fn next_status(&self) -> String {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses.front().cloned().unwrap_or_else(|| "completed".into())
        }
    }
}

fn recipe_details() -> Value {
    json!({
        "recipe_name": "Classic Pancakes",
        "ingredients_list": [
            { "ingredient": "Eggs", "quantity": "2" },
            { "ingredient": "Flour", "quantity": "200 g" },
            { "ingredient": "Milk", "quantity": "250 ml" }
        ],
        "nutritional_information": {
            "calories": 320.0, "protein": 9.5, "fat": 11.0, "carbohydrates": 44.0
        },
        "cooking_steps": [
            { "step": "Whisk everything into a smooth batter", "time": 0, "utility": "none" },
            { "step": "Cook each side until golden", "time": 180, "utility": "stove" }
        ]
    })
}

async fn create_thread() -> Json<Value> {
    Json(json!({ "id": "thread_mock", "object": "thread" }))
}

async fn create_message() -> Json<Value> {
    Json(json!({ "id": "msg_user", "object": "thread.message" }))
}

async fn create_run() -> Json<Value> {
    Json(json!({ "id": "run_mock", "object": "thread.run", "status": "queued" }))
}

async fn retrieve_run(
    State(mock): State<Arc<MockProvider>>,
    Path((_thread, run_id)): Path<(String, String)>,
) -> Json<Value> {
    let status = mock.next_status();
    let requires_action = status == "requires_action";
    let mut run = json!({ "id": run_id, "object": "thread.run", "status": status });
    if requires_action {
        run["required_action"] = json!({
            "type": "submit_tool_outputs",
            "submit_tool_outputs": {
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "create_recipe",
                        "arguments": json!({ "recipe_details": recipe_details() }).to_string()
                    }
                }]
            }
        });
    }
    Json(run)
}

async fn submit_tool_outputs(
    State(mock): State<Arc<MockProvider>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    mock.tool_submissions.fetch_add(1, Ordering::SeqCst);
    *mock.last_tool_outputs.lock().unwrap() = Some(body);
    Json(json!({ "id": "run_mock", "status": "queued" }))
}

async fn list_messages(State(mock): State<Arc<MockProvider>>) -> Json<Value> {
    mock.message_fetches.fetch_add(1, Ordering::SeqCst);
    let blob = json!({ "recipe_details": recipe_details() }).to_string();
    Json(json!({
        "data": [{
            "id": "msg_assistant",
            "role": "assistant",
            "content": [{ "type": "text", "text": { "value": blob } }]
        }]
    }))
}

async fn delete_thread(
    State(mock): State<Arc<MockProvider>>,
    Path(thread_id): Path<String>,
) -> Json<Value> {
    mock.thread_deletes.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "id": thread_id, "deleted": true }))
}

async fn chat_completions(State(mock): State<Arc<MockProvider>>) -> Json<Value> {
    mock.chat_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_1",
                    "function": {
                        "name": "create_recipe",
                        "arguments": json!({ "recipe_details": recipe_details() }).to_string()
                    }
                }]
            }
        }]
    }))
}

async fn serve_mock(mock: Arc<MockProvider>) -> SocketAddr {
    let app = Router::new()
        .route("/threads", post(create_thread))
        .route(
            "/threads/{thread_id}/messages",
            post(create_message).get(list_messages),
        )
        .route("/threads/{thread_id}/runs", post(create_run))
        .route("/threads/{thread_id}/runs/{run_id}", get(retrieve_run))
        .route(
            "/threads/{thread_id}/runs/{run_id}/submit_tool_outputs",
            post(submit_tool_outputs),
        )
        .route("/threads/{thread_id}", delete(delete_thread))
        .route("/chat/completions", post(chat_completions))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr) -> OpenAiClient {
    OpenAiClient::new("test-key", "asst_mock")
        .with_base_url(format!("http://{addr}"))
        .with_poll_interval(Duration::from_millis(5))
        .with_max_polls(10)
}

fn text_request() -> GenerationRequest {
    GenerationRequest {
        text: "eggs, flour, milk".into(),
        images: vec![],
        servings: 2,
        cook_now: true,
        allergies: vec![],
        utilities: vec![],
    }
}

#[tokio::test]
async fn polling_protocol_happy_path() {
    let mock = MockProvider::new(&["queued", "in_progress", "requires_action", "completed"]);
    let addr = serve_mock(mock.clone()).await;

    let recipe = client_for(addr).generate(&text_request()).await.unwrap();

    assert_eq!(recipe.name, "Classic Pancakes");
    assert!(!recipe.ingredients.is_empty());
    assert!(!recipe.steps.is_empty());
    assert_eq!(recipe.steps[0].wait_seconds, 0);
    assert_eq!(recipe.steps[1].wait_seconds, 180);

    // Exactly one tool-output submission, one final fetch, one deletion.
    assert_eq!(mock.tool_submissions.load(Ordering::SeqCst), 1);
    assert_eq!(mock.message_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(mock.thread_deletes.load(Ordering::SeqCst), 1);
    assert_eq!(mock.chat_calls.load(Ordering::SeqCst), 0);

    // The submission echoes the requested call back as its output.
    let outputs = mock.last_tool_outputs.lock().unwrap().clone().unwrap();
    let first = &outputs["tool_outputs"][0];
    assert_eq!(first["tool_call_id"], "call_1");
    assert!(first["output"].as_str().unwrap().contains("create_recipe"));
}

#[tokio::test]
async fn failed_run_still_deletes_thread() {
    let mock = MockProvider::new(&["queued", "failed"]);
    let addr = serve_mock(mock.clone()).await;

    let err = client_for(addr).generate(&text_request()).await.unwrap_err();

    assert!(matches!(err, GenerationError::RunFailed(ref s) if s == "failed"));
    assert!(!err.is_client_error());
    assert_eq!(mock.thread_deletes.load(Ordering::SeqCst), 1);
    assert_eq!(mock.message_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn poll_budget_exhaustion_deletes_thread() {
    let mock = MockProvider::new(&["in_progress"]);
    let addr = serve_mock(mock.clone()).await;

    let client = client_for(addr).with_max_polls(3);
    let err = client.generate(&text_request()).await.unwrap_err();

    assert!(matches!(err, GenerationError::PollBudgetExhausted(3)));
    assert_eq!(mock.thread_deletes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn image_request_takes_single_round_trip() {
    let mock = MockProvider::new(&["completed"]);
    let addr = serve_mock(mock.clone()).await;

    let img = image::RgbImage::from_pixel(900, 600, image::Rgb([200, 100, 50]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let req = GenerationRequest {
        images: vec![Bytes::from(png)],
        ..text_request()
    };
    let recipe = client_for(addr).generate(&req).await.unwrap();

    assert_eq!(recipe.name, "Classic Pancakes");
    assert_eq!(mock.chat_calls.load(Ordering::SeqCst), 1);
    // No thread machinery on the synchronous path.
    assert_eq!(mock.thread_deletes.load(Ordering::SeqCst), 0);
    assert_eq!(mock.tool_submissions.load(Ordering::SeqCst), 0);
}
