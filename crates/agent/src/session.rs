//! Session Orchestrator
//!
//! Drives one conversation over a model connection:
//!
//! ```text
//!  user turn ──▶ append + trigger ──▶ drain turn ──┬─ ToolBatch ──▶ gate ──▶ outputs + trigger ─┐
//!                                                  │                                            │
//!                                                  │◀───────────────────────────────────────────┘
//!                                                  └─ FinalUtterance ──▶ playback ──▶ text
//! ```

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::broadcast;

use visit_agent_config::Settings;
use visit_agent_core::{
    AudioSink, ModelConnection, ToolCall, TurnResult, UserContent, UtteranceCapture,
};
use visit_agent_llm::{drain_turn, InstructionsBuilder, RealtimeConnection};
use visit_agent_pipeline::{encode_wav, MicrophoneCapture, RodioSink};
use visit_agent_tools::{tool_definitions, CrmIntegration};

use crate::events::{AgentEvent, SessionState};
use crate::gate::{ToolGate, ToolOutcome, ValidationState};
use crate::AgentError;

/// How the user provides a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Text,
    Voice,
}

impl FromStr for InputMode {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "t" => Ok(InputMode::Text),
            "voice" | "v" => Ok(InputMode::Voice),
            other => Err(AgentError::InvalidInput(format!(
                "unknown input mode '{}', expected text or voice",
                other
            ))),
        }
    }
}

/// A validated user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Text(String),
    /// Record from the microphone until trailing silence
    Voice,
}

impl UserInput {
    /// Build an input from a raw mode string and optional text
    pub fn from_mode(mode: &str, content: Option<&str>) -> Result<Self, AgentError> {
        match mode.parse::<InputMode>()? {
            InputMode::Voice => Ok(UserInput::Voice),
            InputMode::Text => {
                let text = content.map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    return Err(AgentError::InvalidInput(
                        "text mode requires a non-empty message".to_string(),
                    ));
                }
                Ok(UserInput::Text(text.to_string()))
            },
        }
    }
}

/// One conversation with the model
pub struct VisitSession {
    session_id: String,
    model: Box<dyn ModelConnection>,
    gate: ToolGate,
    capture: Option<Box<dyn UtteranceCapture>>,
    sink: Option<Box<dyn AudioSink>>,
    max_tool_rounds: Option<u32>,
    state: SessionState,
    event_tx: broadcast::Sender<AgentEvent>,
}

impl VisitSession {
    /// Create a session over an already configured model connection
    pub fn new(model: Box<dyn ModelConnection>, gate: ToolGate) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            model,
            gate,
            capture: None,
            sink: None,
            max_tool_rounds: None,
            state: SessionState::AwaitingInput,
            event_tx,
        }
    }

    /// Enable voice turns
    pub fn with_capture(mut self, capture: Box<dyn UtteranceCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Play spoken responses
    pub fn with_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Fail a turn after this many tool batches instead of looping forever
    pub fn with_max_tool_rounds(mut self, max: Option<u32>) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Connect to the realtime service, publish instructions and tools,
    /// and attach the local microphone and speaker
    pub async fn connect(
        settings: &Settings,
        crm: Arc<dyn CrmIntegration>,
    ) -> Result<Self, AgentError> {
        let upload_mode = settings.agent.upload_mode;
        let mut model = RealtimeConnection::connect(&settings.realtime).await?;

        let instructions = InstructionsBuilder::today()
            .with_upload_mode(upload_mode)
            .build();
        model
            .configure(&instructions, &tool_definitions(upload_mode))
            .await?;

        let mut session = Self::new(Box::new(model), ToolGate::new(crm, upload_mode))
            .with_capture(Box::new(MicrophoneCapture::new(settings.audio.clone())))
            .with_max_tool_rounds(settings.agent.max_tool_rounds);
        if settings.playback.enabled {
            session = session.with_sink(Box::new(RodioSink::new(&settings.playback)));
        }

        tracing::info!(
            session_id = %session.session_id,
            model = %session.model.model_name(),
            upload_mode = ?upload_mode,
            "Session ready"
        );
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn validation(&self) -> &ValidationState {
        self.gate.state()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_tx.subscribe()
    }

    /// Run one user turn from a raw mode string
    ///
    /// An invalid mode or empty text fails before the model is contacted.
    pub async fn interact_mode(
        &mut self,
        mode: &str,
        content: Option<&str>,
    ) -> Result<String, AgentError> {
        let input = UserInput::from_mode(mode, content)?;
        self.interact(input).await
    }

    /// Run one user turn and return the assistant's final text
    pub async fn interact(&mut self, input: UserInput) -> Result<String, AgentError> {
        // voice capture blocks this thread until the speaker stops
        let content = match input {
            UserInput::Text(text) => UserContent::Text(text),
            UserInput::Voice => UserContent::Audio(self.record()?),
        };

        metrics::counter!("visit_agent_turns_total").increment(1);
        self.set_state(SessionState::AwaitingModel);
        let result = self.run_turn(content).await;
        self.set_state(SessionState::AwaitingInput);

        match &result {
            Ok(text) => {
                let _ = self.event_tx.send(AgentEvent::Response(text.clone()));
            },
            Err(e) => tracing::error!(session_id = %self.session_id, error = %e, "Turn failed"),
        }
        result
    }

    fn record(&mut self) -> Result<Vec<u8>, AgentError> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| AgentError::Device("no audio capture device configured".to_string()))?;
        let clip = capture.capture()?;
        if clip.is_silent() {
            tracing::info!(frames = clip.frames, "No speech detected, sending silence");
        }
        Ok(encode_wav(&clip)?)
    }

    async fn run_turn(&mut self, content: UserContent) -> Result<String, AgentError> {
        self.model.append_user_message(content).await?;
        self.trigger().await?;

        let mut rounds: u32 = 0;
        loop {
            let turn = drain_turn(self.model.events()).await?;
            match turn {
                TurnResult::ToolBatch(calls) => {
                    rounds += 1;
                    if let Some(max) = self.max_tool_rounds {
                        if rounds > max {
                            return Err(AgentError::Model(format!(
                                "model requested tools {} times without answering",
                                rounds
                            )));
                        }
                    }

                    if calls.is_empty() {
                        tracing::warn!(round = rounds, "Tool batch had no named calls; asking again");
                    }
                    tracing::debug!(calls = calls.len(), round = rounds, "Dispatching tool batch");
                    for call in &calls {
                        let outcome = self.dispatch(call).await;
                        self.model
                            .append_tool_output(&call.id, &outcome.output().to_string())
                            .await?;
                    }
                    self.trigger().await?;
                },
                TurnResult::FinalUtterance { text, audio } => {
                    if !audio.is_empty() {
                        if let Some(sink) = self.sink.as_mut() {
                            sink.play(std::slice::from_ref(&audio))?;
                        }
                    }
                    return Ok(text);
                },
            }
        }
    }

    async fn trigger(&mut self) -> Result<(), AgentError> {
        metrics::counter!("visit_agent_generation_requests_total").increment(1);
        self.model.trigger_generation().await?;
        Ok(())
    }

    async fn dispatch(&mut self, call: &ToolCall) -> ToolOutcome {
        let _ = self.event_tx.send(AgentEvent::ToolCall {
            call_id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        let outcome = self.gate.dispatch(call).await;

        let event = match &outcome {
            ToolOutcome::Success(output) => AgentEvent::ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                output: output.clone(),
            },
            ToolOutcome::Failed(err) => AgentEvent::ToolError {
                call_id: call.id.clone(),
                name: call.name.clone(),
                error: err.to_output(),
            },
            ToolOutcome::Blocked(_) => AgentEvent::GateViolation {
                call_id: call.id.clone(),
                name: call.name.clone(),
            },
        };
        let _ = self.event_tx.send(event);
        outcome
    }

    fn set_state(&mut self, new_state: SessionState) {
        let old_state = std::mem::replace(&mut self.state, new_state);
        if old_state != new_state {
            let _ = self.event_tx.send(AgentEvent::StateChanged {
                old: old_state,
                new: new_state,
            });
        }
    }
}
