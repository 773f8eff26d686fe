use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{CallConfig, ChatMessage, FunctionCall, LlmResponse, ToolCall, ToolDef};

/// HTTP client for any `/chat/completions` endpoint. The URL, key and model
/// come with each call, so one client serves whatever endpoint a run names.
pub struct OpenAiCompatibleProvider {
    id: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, connect_timeout: Duration, read_timeout: Duration) -> DroidClawResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()
            .map_err(|e| DroidClawError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { id, client })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        cfg: &CallConfig,
    ) -> DroidClawResult<LlmResponse> {
        let body = build_request_body(messages, tools, cfg)?;

        tracing::debug!(
            provider = %self.id,
            model = %cfg.endpoint.model,
            url = %cfg.endpoint.chat_completions_url(),
            messages = messages.len(),
            "sending LLM request"
        );
        tracing::debug!(
            body = %serde_json::to_string(&redact_images(&body)).unwrap_or_default(),
            "request body (sanitized, base64 omitted)"
        );

        let response = self
            .client
            .post(cfg.endpoint.chat_completions_url())
            .bearer_auth(&cfg.endpoint.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DroidClawError::Protocol(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(DroidClawError::Protocol(format!("{}: {}", status, err_body)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DroidClawError::Protocol(format!("unreadable response body: {e}")))?;
        let parsed = parse_chat_response(&json)?;

        tracing::info!(
            content_len = parsed.content.len(),
            tool_calls = parsed.tool_calls.len(),
            tools = ?parsed.tool_calls.iter().map(|tc| tc.function.name.as_str()).collect::<Vec<_>>(),
            "LLM response received"
        );
        Ok(parsed)
    }
}

pub fn build_request_body(
    messages: &[ChatMessage],
    tools: &[ToolDef],
    cfg: &CallConfig,
) -> DroidClawResult<serde_json::Value> {
    let mut body = serde_json::json!({
        "model": cfg.endpoint.model,
        "messages": messages,
    });
    if !tools.is_empty() {
        body["tools"] = serde_json::to_value(tools)?;
        body["tool_choice"] = serde_json::json!("auto");
    }
    Ok(body)
}

/// Copy of `body` with every base64 image URL replaced, for logging only.
pub fn redact_images(body: &serde_json::Value) -> serde_json::Value {
    let mut log_body = body.clone();
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            // content can be string or array of parts; only the array case carries images.
            let Some(parts) = msg.get_mut("content").and_then(|c| c.as_array_mut()) else {
                continue;
            };
            for part in parts {
                if part.get("type").and_then(|t| t.as_str()) == Some("image_url") {
                    if let Some(url) = part.get_mut("image_url").and_then(|u| u.get_mut("url")) {
                        *url = serde_json::Value::String("<omitted_base64_image>".to_string());
                    }
                }
            }
        }
    }
    log_body
}

/// Extract `choices[0].message` from a chat-completion response.
/// A null or missing `content` is normalized to an empty string.
pub fn parse_chat_response(json: &serde_json::Value) -> DroidClawResult<LlmResponse> {
    let message = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| DroidClawError::Protocol(format!("response has no choices[0].message: {json}")))?;

    let content = message["content"].as_str().unwrap_or("").to_string();

    let tool_calls: Vec<ToolCall> = message["tool_calls"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|tc| ToolCall {
                    id: tc["id"].as_str().unwrap_or("").to_string(),
                    call_type: tc["type"].as_str().unwrap_or("function").to_string(),
                    function: FunctionCall {
                        name: tc["function"]["name"].as_str().unwrap_or("").to_string(),
                        arguments: tc["function"]["arguments"]
                            .as_str()
                            .unwrap_or("{}")
                            .to_string(),
                    },
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(LlmResponse { content, tool_calls })
}
