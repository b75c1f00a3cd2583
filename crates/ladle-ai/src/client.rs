//! The generation adapter: orchestrates image preprocessing, the two LLM
//! invocation styles, and response normalization.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::Bytes;
use ladle_types::models::Recipe;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{GenerationError, image, normalize, schema};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Bound on the polling loop. At the 1 s default interval this caps a run
/// at roughly two minutes instead of waiting on a stuck run forever.
const DEFAULT_MAX_POLLS: u32 = 120;

/// One generation call, built from the multipart form and discarded after
/// the response is sent. Never persisted.
#[derive(Debug, Default)]
pub struct GenerationRequest {
    pub text: String,
    pub images: Vec<Bytes>,
    pub servings: u32,
    pub cook_now: bool,
    pub allergies: Vec<String>,
    pub utilities: Vec<String>,
}

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    assistant_id: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            assistant_id: assistant_id.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Produce a recipe for the request. With at least one usable image the
    /// provider is called once via chat completions; without images an
    /// assistant run is created and polled to completion. Either way the
    /// response is normalized into the canonical recipe shape.
    pub async fn generate(&self, req: &GenerationRequest) -> Result<Recipe, GenerationError> {
        let prompt = schema::build_prompt(
            &req.text,
            req.servings,
            req.cook_now,
            &req.allergies,
            &req.utilities,
        );
        let images = image::preprocess(&req.images);

        let message = if images.is_empty() {
            debug!("No usable images, running assistant thread");
            self.run_assistant(&prompt).await?
        } else {
            debug!(count = images.len(), "Sending multimodal chat completion");
            self.chat_completion(&prompt, &images).await?
        };

        normalize::into_recipe(&message)
    }

    /// Synchronous path: one multimodal chat completion, structured output
    /// requested through the `create_recipe` function tool.
    async fn chat_completion(
        &self,
        prompt: &str,
        images: &[Vec<u8>],
    ) -> Result<Value, GenerationError> {
        let mut content = vec![json!({ "type": "text", "text": prompt })];
        for jpeg in images {
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/jpeg;base64,{}", B64.encode(jpeg)) }
            }));
        }

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": schema::SYSTEM_PROMPT },
                { "role": "user", "content": content }
            ],
            "max_tokens": 4096,
            "temperature": 0.7,
            "response_format": { "type": "json_object" },
            "tools": [{ "type": "function", "function": schema::recipe_function() }]
        });

        let resp = self.post("/chat/completions", &body).await?;
        resp.pointer("/choices/0/message")
            .cloned()
            .ok_or(GenerationError::MissingField("choices[0].message"))
    }

    /// Asynchronous path: create a thread, post the prompt, run the
    /// configured assistant and poll to a terminal state. The thread is
    /// deleted after any outcome — success, failure, or poll exhaustion.
    async fn run_assistant(&self, prompt: &str) -> Result<Value, GenerationError> {
        let thread = self.post("/threads", &json!({})).await?;
        let thread_id = thread
            .get("id")
            .and_then(Value::as_str)
            .ok_or(GenerationError::MissingField("thread.id"))?
            .to_string();

        let result = self.drive_run(&thread_id, prompt).await;

        if let Err(e) = self.delete_thread(&thread_id).await {
            warn!("Failed to delete thread {}: {}", thread_id, e);
        }

        result
    }

    async fn drive_run(&self, thread_id: &str, prompt: &str) -> Result<Value, GenerationError> {
        self.post(
            &format!("/threads/{thread_id}/messages"),
            &json!({
                "role": "user",
                "content": format!("{prompt} (respond with json object)")
            }),
        )
        .await?;

        let run = self
            .post(
                &format!("/threads/{thread_id}/runs"),
                &json!({
                    "assistant_id": self.assistant_id,
                    "tools": [{ "type": "function", "function": schema::recipe_function() }]
                }),
            )
            .await?;
        let run_id = run
            .get("id")
            .and_then(Value::as_str)
            .ok_or(GenerationError::MissingField("run.id"))?
            .to_string();

        for _ in 0..self.max_polls {
            let run = self
                .get(&format!("/threads/{thread_id}/runs/{run_id}"))
                .await?;
            let status = run.get("status").and_then(Value::as_str).unwrap_or("");

            match status {
                "completed" => return self.latest_message(thread_id).await,
                "failed" | "cancelled" | "expired" => {
                    return Err(GenerationError::RunFailed(status.to_string()));
                }
                "requires_action" => {
                    self.submit_tool_outputs(thread_id, &run_id, &run).await?;
                }
                other => debug!(status = other, "Run not terminal yet"),
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        Err(GenerationError::PollBudgetExhausted(self.max_polls))
    }

    /// Service a `requires_action` state by echoing each requested tool
    /// call's function payload back as that call's output. The run only
    /// needs the acknowledgment; no computation happens on our side.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        run: &Value,
    ) -> Result<(), GenerationError> {
        let calls = run
            .pointer("/required_action/submit_tool_outputs/tool_calls")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let outputs: Vec<Value> = calls
            .iter()
            .map(|call| {
                json!({
                    "tool_call_id": call.get("id").cloned().unwrap_or(Value::Null),
                    "output": call.get("function").map(Value::to_string).unwrap_or_default()
                })
            })
            .collect();

        self.post(
            &format!("/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            &json!({ "tool_outputs": outputs }),
        )
        .await?;
        Ok(())
    }

    /// The newest message on the thread — index 0, the provider lists
    /// newest first.
    async fn latest_message(&self, thread_id: &str) -> Result<Value, GenerationError> {
        let messages = self.get(&format!("/threads/{thread_id}/messages")).await?;
        messages
            .pointer("/data/0")
            .cloned()
            .ok_or(GenerationError::MissingField("messages.data[0]"))
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), GenerationError> {
        self.http
            .delete(format!("{}/threads/{thread_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, GenerationError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    async fn get(&self, path: &str) -> Result<Value, GenerationError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}
