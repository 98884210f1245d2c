//! Realtime websocket connection
//!
//! Speaks the realtime event protocol shared by Azure OpenAI and OpenAI.
//! Outbound: `session.update`, `conversation.item.create`,
//! `response.create`. Inbound events are decoded into [`StreamEvent`];
//! anything not needed for turn aggregation is skipped.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use visit_agent_config::constants::realtime::DEFAULT_OPENAI_ENDPOINT;
use visit_agent_config::{RealtimeConfig, RealtimeProvider};
use visit_agent_core::{EventStream, ModelConnection, StreamEvent, ToolDefinition, UserContent};

use crate::LlmError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Websocket URL for the configured provider
pub fn realtime_url(config: &RealtimeConfig) -> Result<String, LlmError> {
    match config.provider {
        RealtimeProvider::Azure => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                LlmError::Configuration("realtime.endpoint is required for Azure".to_string())
            })?;
            let base = to_ws_scheme(endpoint.trim_end_matches('/'));
            let base = if base.ends_with("/openai/realtime") {
                base
            } else {
                format!("{}/openai/realtime", base)
            };
            Ok(format!(
                "{}?api-version={}&deployment={}",
                base, config.api_version, config.deployment
            ))
        },
        RealtimeProvider::OpenAi => {
            let endpoint = config
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_OPENAI_ENDPOINT)
                .trim_end_matches('/');
            Ok(format!("{}?model={}", to_ws_scheme(endpoint), config.deployment))
        },
    }
}

fn to_ws_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        url.to_string()
    }
}

fn header(value: &str) -> Result<HeaderValue, LlmError> {
    HeaderValue::from_str(value)
        .map_err(|e| LlmError::Configuration(format!("Invalid header value: {}", e)))
}

/// Live realtime session
pub struct RealtimeConnection {
    writer: SplitSink<WsStream, Message>,
    reader: SplitStream<WsStream>,
    model: String,
    voice: String,
}

impl RealtimeConnection {
    /// Open the websocket and authenticate
    pub async fn connect(config: &RealtimeConfig) -> Result<Self, LlmError> {
        let url = realtime_url(config)?;
        let api_key = config.resolved_api_key().ok_or_else(|| {
            LlmError::Configuration(
                "No API key configured (realtime.api_key or provider key variable)".to_string(),
            )
        })?;

        let mut request = url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        match config.provider {
            RealtimeProvider::Azure => {
                headers.insert("api-key", header(&api_key)?);
            },
            RealtimeProvider::OpenAi => {
                headers.insert("Authorization", header(&format!("Bearer {}", api_key))?);
                headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));
            },
        }

        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let (ws, _response) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| LlmError::Timeout)??;

        tracing::info!(
            provider = ?config.provider,
            model = %config.deployment,
            "Connected to realtime model"
        );

        let (writer, reader) = ws.split();
        Ok(Self {
            writer,
            reader,
            model: config.deployment.clone(),
            voice: config.voice.clone(),
        })
    }

    async fn send(&mut self, payload: Value) -> Result<(), LlmError> {
        tracing::trace!(kind = %payload["type"], "Sending realtime event");
        self.writer.send(Message::Text(payload.to_string())).await?;
        Ok(())
    }
}

#[async_trait]
impl ModelConnection for RealtimeConnection {
    async fn configure(
        &mut self,
        instructions: &str,
        tools: &[ToolDefinition],
    ) -> visit_agent_core::Result<()> {
        let payload = session_update(instructions, tools, &self.voice);
        self.send(payload).await?;
        Ok(())
    }

    async fn append_user_message(&mut self, content: UserContent) -> visit_agent_core::Result<()> {
        tracing::debug!(audio = content.is_audio(), "Appending user message");
        self.send(user_message_item(&content)).await?;
        Ok(())
    }

    async fn append_tool_output(
        &mut self,
        call_id: &str,
        output: &str,
    ) -> visit_agent_core::Result<()> {
        self.send(function_call_output_item(call_id, output)).await?;
        Ok(())
    }

    async fn trigger_generation(&mut self) -> visit_agent_core::Result<()> {
        self.send(json!({"type": "response.create"})).await?;
        Ok(())
    }

    fn events(&mut self) -> EventStream<'_> {
        Box::pin(async_stream::stream! {
            loop {
                let message = match self.reader.next().await {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        yield Err(visit_agent_core::Error::from(LlmError::from(e)));
                        break;
                    },
                    None => break,
                };

                match message {
                    Message::Text(text) => {
                        if let Some(event) = decode_server_event(&text) {
                            let finished = event == StreamEvent::TurnComplete;
                            yield Ok(event);
                            if finished {
                                break;
                            }
                        }
                    },
                    Message::Close(frame) => {
                        tracing::info!(?frame, "Realtime connection closed by server");
                        break;
                    },
                    _ => {},
                }
            }
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// `session.update` carrying instructions and tools
pub fn session_update(instructions: &str, tools: &[ToolDefinition], voice: &str) -> Value {
    let tools: Vec<Value> = tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "name": t.name,
                "description": t.description,
                "parameters": t.parameters,
            })
        })
        .collect();

    json!({
        "type": "session.update",
        "session": {
            "modalities": ["text", "audio"],
            "voice": voice,
            "instructions": instructions,
            "tools": tools,
            "tool_choice": "auto",
            // turns are committed explicitly with response.create
            "turn_detection": null,
        }
    })
}

/// `conversation.item.create` for a user message
pub fn user_message_item(content: &UserContent) -> Value {
    let part = match content {
        UserContent::Text(text) => json!({"type": "input_text", "text": text}),
        UserContent::Audio(wav) => json!({"type": "input_audio", "audio": B64.encode(wav)}),
    };
    json!({
        "type": "conversation.item.create",
        "item": {
            "type": "message",
            "role": "user",
            "content": [part],
        }
    })
}

/// `conversation.item.create` answering a tool call
pub fn function_call_output_item(call_id: &str, output: &str) -> Value {
    json!({
        "type": "conversation.item.create",
        "item": {
            "type": "function_call_output",
            "call_id": call_id,
            "output": output,
        }
    })
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ServerEvent {
    #[serde(rename = "response.audio.delta")]
    AudioDelta { delta: String },
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone { transcript: String },
    #[serde(rename = "response.text.done")]
    TextDone { text: String },
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta { call_id: String, delta: String },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        call_id: String,
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone { item: OutputItem },
    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        response: Option<Value>,
    },
    #[serde(rename = "error")]
    Error { error: ErrorDetail },
    #[serde(other)]
    Other,
}

/// Map one wire event to a [`StreamEvent`]; `None` for skipped events
pub fn decode_server_event(text: &str) -> Option<StreamEvent> {
    let event: ServerEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Undecodable realtime event skipped");
            return None;
        },
    };

    match event {
        ServerEvent::AudioDelta { delta } => match B64.decode(delta.as_bytes()) {
            Ok(bytes) => Some(StreamEvent::AudioFragment(bytes)),
            Err(e) => {
                tracing::warn!(error = %e, "Audio delta is not valid base64");
                None
            },
        },
        ServerEvent::AudioTranscriptDone { transcript } => {
            Some(StreamEvent::TranscriptComplete(transcript))
        },
        ServerEvent::TextDone { text } => Some(StreamEvent::TranscriptComplete(text)),
        ServerEvent::FunctionCallArgumentsDelta { call_id, delta } => {
            Some(StreamEvent::ToolArgsFragment { call_id, delta })
        },
        ServerEvent::FunctionCallArgumentsDone { call_id, name } => {
            name.map(|name| StreamEvent::ToolNameResolved { call_id, name })
        },
        ServerEvent::OutputItemDone { item } if item.kind == "function_call" => {
            match (item.call_id, item.name) {
                (Some(call_id), Some(name)) => Some(StreamEvent::ToolNameResolved { call_id, name }),
                _ => None,
            }
        },
        ServerEvent::OutputItemDone { .. } => None,
        ServerEvent::ResponseDone { response } => {
            if let Some(status) = response.as_ref().and_then(|r| r.get("status")) {
                tracing::debug!(%status, "Response done");
            }
            Some(StreamEvent::TurnComplete)
        },
        ServerEvent::Error { error } => Some(StreamEvent::ServerError {
            message: error.message,
        }),
        ServerEvent::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_azure_url() {
        let config = RealtimeConfig {
            endpoint: Some("https://contoso.openai.azure.com/".into()),
            ..Default::default()
        };
        assert_eq!(
            realtime_url(&config).unwrap(),
            "wss://contoso.openai.azure.com/openai/realtime?api-version=2025-04-01-preview&deployment=gpt-4o-mini-realtime-preview"
        );

        let missing = RealtimeConfig::default();
        assert!(matches!(realtime_url(&missing), Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_openai_url() {
        let config = RealtimeConfig {
            provider: RealtimeProvider::OpenAi,
            deployment: "gpt-4o-realtime-preview".into(),
            ..Default::default()
        };
        assert_eq!(
            realtime_url(&config).unwrap(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview"
        );
    }

    #[test]
    fn test_decode_audio_and_transcript() {
        let audio = decode_server_event(r#"{"type":"response.audio.delta","delta":"AQID"}"#);
        assert_eq!(audio, Some(StreamEvent::AudioFragment(vec![1, 2, 3])));

        let done = decode_server_event(
            r#"{"type":"response.audio_transcript.done","transcript":"Hi there","item_id":"x"}"#,
        );
        assert_eq!(done, Some(StreamEvent::TranscriptComplete("Hi there".into())));
    }

    #[test]
    fn test_decode_tool_events() {
        let delta = decode_server_event(
            r#"{"type":"response.function_call_arguments.delta","call_id":"c1","delta":"{\"a\":"}"#,
        );
        assert_eq!(
            delta,
            Some(StreamEvent::ToolArgsFragment {
                call_id: "c1".into(),
                delta: "{\"a\":".into()
            })
        );

        let done = decode_server_event(
            r#"{"type":"response.function_call_arguments.done","call_id":"c1","name":"find_account_by_name","arguments":"{}"}"#,
        );
        assert_eq!(
            done,
            Some(StreamEvent::ToolNameResolved {
                call_id: "c1".into(),
                name: "find_account_by_name".into()
            })
        );

        let item = decode_server_event(
            r#"{"type":"response.output_item.done","item":{"type":"function_call","call_id":"c2","name":"list_contacts_for_account"}}"#,
        );
        assert!(matches!(item, Some(StreamEvent::ToolNameResolved { ref call_id, .. }) if call_id == "c2"));

        let message_item = decode_server_event(
            r#"{"type":"response.output_item.done","item":{"type":"message","id":"m1"}}"#,
        );
        assert_eq!(message_item, None);
    }

    #[test]
    fn test_decode_done_error_and_unknown() {
        assert_eq!(
            decode_server_event(r#"{"type":"response.done","response":{"status":"completed"}}"#),
            Some(StreamEvent::TurnComplete)
        );
        assert_eq!(
            decode_server_event(r#"{"type":"error","error":{"message":"bad request"}}"#),
            Some(StreamEvent::ServerError {
                message: "bad request".into()
            })
        );
        assert_eq!(decode_server_event(r#"{"type":"session.created","session":{}}"#), None);
        assert_eq!(decode_server_event("not json"), None);
    }

    #[test]
    fn test_outbound_payloads() {
        let tools = vec![ToolDefinition::new(
            "find_account_by_name",
            "Find an account",
            json!({"type": "object"}),
        )];
        let update = session_update("Be helpful", &tools, "alloy");
        assert_eq!(update["type"], "session.update");
        assert_eq!(update["session"]["tools"][0]["type"], "function");
        assert_eq!(update["session"]["tools"][0]["name"], "find_account_by_name");
        assert_eq!(update["session"]["tool_choice"], "auto");

        let text = user_message_item(&UserContent::Text("hello".into()));
        assert_eq!(text["item"]["content"][0]["type"], "input_text");
        assert_eq!(text["item"]["content"][0]["text"], "hello");

        let audio = user_message_item(&UserContent::Audio(vec![1, 2, 3]));
        assert_eq!(audio["item"]["content"][0]["type"], "input_audio");
        assert_eq!(audio["item"]["content"][0]["audio"], "AQID");

        let output = function_call_output_item("c1", "{\"status\":\"not_found\"}");
        assert_eq!(output["item"]["type"], "function_call_output");
        assert_eq!(output["item"]["call_id"], "c1");
    }
}
