//! A generic OpenAI Chat-Completions-compatible HTTP client. Any endpoint
//! speaking that wire format — hosted or local inference server — can
//! serve any role through this one provider implementation.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};

use crate::message::{Message, ToolCall};

use super::provider::{CompletionRequest, CompletionResponse, LLMProvider, StreamItem, TokenStream};

pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self { client, base_url: base_url.into(), api_key }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

/// Convert our internal [`Message`] log into OpenAI's wire format. The
/// caller is responsible for having already sanitised and truncated the
/// log and prepended the system message.
fn messages_to_wire(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| match m {
            Message::System { content, .. } => json!({"role": "system", "content": content}),
            Message::User { content, .. } => json!({"role": "user", "content": content}),
            Message::Assistant { content, tool_calls, .. } => {
                if tool_calls.is_empty() {
                    json!({"role": "assistant", "content": content})
                } else {
                    let wire_calls: Vec<Value> = tool_calls
                        .iter()
                        .map(|c| {
                            json!({
                                "id": c.id,
                                "type": "function",
                                "function": {"name": c.name, "arguments": c.args.to_string()}
                            })
                        })
                        .collect();
                    json!({"role": "assistant", "content": content, "tool_calls": wire_calls})
                }
            }
            Message::Tool { tool_call_id, content, .. } => {
                json!({"role": "tool", "tool_call_id": tool_call_id, "content": content})
            }
        })
        .collect()
}

fn tools_to_wire(tools: &[Value]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| json!({"type": "function", "function": t}))
        .collect()
}

fn build_body(request: &CompletionRequest, stream: bool) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": messages_to_wire(&request.messages),
        "temperature": request.temperature,
        "stream": stream,
    });
    if !request.tools.is_empty() {
        body["tools"] = Value::Array(tools_to_wire(&request.tools));
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

/// Parse one OpenAI `choices[0].message` object into an `Assistant`
/// [`Message`]. Unparseable tool-call argument strings are preserved as a
/// JSON string value rather than failing the whole response.
fn parse_assistant_message(choice_message: &Value) -> Message {
    let content = choice_message.get("content").and_then(Value::as_str).unwrap_or_default().to_string();
    let tool_calls = choice_message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|c| {
                    let id = c.get("id")?.as_str()?.to_string();
                    let function = c.get("function")?;
                    let name = function.get("name")?.as_str()?.to_string();
                    let raw_args = function.get("arguments").and_then(Value::as_str).unwrap_or("{}");
                    let args = serde_json::from_str(raw_args).unwrap_or_else(|_| Value::String(raw_args.to_string()));
                    Some(ToolCall { id, name, args })
                })
                .collect()
        })
        .unwrap_or_default();

    Message::assistant(content, tool_calls)
}

#[async_trait]
impl LLMProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, String> {
        let body = build_body(&request, false);
        let response = self
            .request_builder(&self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("provider returned {status}: {text}"));
        }

        let payload: Value = response.json().await.map_err(|e| format!("invalid JSON response: {e}"))?;
        let choice_message = payload
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .ok_or("response missing choices[0].message")?;

        Ok(CompletionResponse { message: parse_assistant_message(choice_message) })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream, String> {
        let body = build_body(&request, true);
        let response = self
            .request_builder(&self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("provider returned {status}: {text}"));
        }

        let byte_stream = response.bytes_stream();
        let token_stream = byte_stream.flat_map(|chunk| {
            let items: Vec<StreamItem> = match chunk {
                Ok(bytes) => parse_sse_chunk(&bytes),
                Err(e) => vec![Err(format!("stream error: {e}"))],
            };
            futures::stream::iter(items)
        });

        Ok(Box::pin(token_stream))
    }

    fn provider_name(&self) -> &str {
        "openai-compatible"
    }

    async fn warmup(&self) -> Result<(), String> {
        let mut builder = self.client.get(format!("{}/models", self.base_url.trim_end_matches('/')));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder.send().await.map(|_| ()).map_err(|e| format!("warmup failed: {e}"))
    }
}

/// Parse one `text/event-stream` chunk of `data: {...}` lines into token
/// deltas. A `data: [DONE]` line produces no item.
fn parse_sse_chunk(bytes: &[u8]) -> Vec<StreamItem> {
    let text = String::from_utf8_lossy(bytes);
    let mut out = Vec::new();
    for line in text.lines() {
        let Some(payload) = line.strip_prefix("data: ") else { continue };
        if payload.trim() == "[DONE]" {
            continue;
        }
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => {
                if let Some(delta) = value
                    .get("choices")
                    .and_then(Value::as_array)
                    .and_then(|c| c.first())
                    .and_then(|c| c.get("delta"))
                    .and_then(|d| d.get("content"))
                    .and_then(Value::as_str)
                {
                    out.push(Ok(delta.to_string()));
                }
            }
            Err(e) => out.push(Err(format!("malformed SSE payload: {e}"))),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_to_wire_preserves_roles() {
        let messages = vec![Message::system("sys"), Message::user("hi"), Message::assistant("hello", vec![])];
        let wire = messages_to_wire(&messages);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[2]["role"], "assistant");
    }

    #[test]
    fn messages_to_wire_serialises_tool_calls_as_stringified_arguments() {
        let call = ToolCall { id: "c1".into(), name: "memory_operation".into(), args: json!({"action": "recall"}) };
        let messages = vec![Message::assistant("", vec![call])];
        let wire = messages_to_wire(&messages);
        let args = wire[0]["tool_calls"][0]["function"]["arguments"].as_str().unwrap();
        assert!(args.contains("recall"));
    }

    #[test]
    fn parse_assistant_message_without_tool_calls() {
        let raw = json!({"role": "assistant", "content": "hi there"});
        let message = parse_assistant_message(&raw);
        assert!(message.is_terminal_assistant());
    }

    #[test]
    fn parse_assistant_message_with_tool_calls() {
        let raw = json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [{"id": "c1", "type": "function", "function": {"name": "shell_execute", "arguments": "{\"command\":\"ls\"}"}}]
        });
        let message = parse_assistant_message(&raw);
        assert_eq!(message.tool_calls().len(), 1);
        assert_eq!(message.tool_calls()[0].name, "shell_execute");
    }

    #[test]
    fn parse_sse_chunk_extracts_content_deltas() {
        let chunk = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n";
        let items = parse_sse_chunk(chunk);
        let tokens: Vec<String> = items.into_iter().map(|i| i.unwrap()).collect();
        assert_eq!(tokens, vec!["Hel".to_string(), "lo".to_string()]);
    }
}
