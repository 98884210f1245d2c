//! REPL commands and rendering

use visit_agent_agent::AgentEvent;
use visit_agent_core::{ConversationHistory, TurnRole};

/// One line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `t <message>` or `t` followed by a prompt for the message
    Text(Option<String>),
    Voice,
    History,
    Clear,
    Quit,
    Help,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, Some(rest.trim())),
            None => (line, None),
        };

        match head.to_lowercase().as_str() {
            "t" | "text" => Command::Text(rest.filter(|r| !r.is_empty()).map(String::from)),
            "v" | "voice" => Command::Voice,
            "h" | "history" => Command::History,
            "c" | "clear" => Command::Clear,
            "q" | "quit" | "exit" => Command::Quit,
            "" | "?" | "help" => Command::Help,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  t [message]  type a message
  v            record a voice message (stops after a pause)
  h            show the conversation
  c            clear the conversation
  q            quit";

/// Render the conversation for the terminal
pub fn render_history(history: &ConversationHistory) -> String {
    if history.is_empty() {
        return "(no messages yet)".to_string();
    }
    history
        .turns()
        .iter()
        .map(|turn| {
            let who = match turn.role {
                TurnRole::User => "you",
                TurnRole::Assistant => "agent",
            };
            format!("[{}] {}: {}", turn.timestamp.format("%H:%M:%S"), who, turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sidebar line for a tool event, if it is one
pub fn render_tool_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::ToolCall { name, arguments, .. } => {
            Some(format!("  -> {} {}", name, arguments))
        },
        AgentEvent::ToolResult { name, output, .. } => Some(format!("  <- {} {}", name, output)),
        AgentEvent::ToolError { name, error, .. } => {
            Some(format!("  !! {} {}", name, error))
        },
        AgentEvent::GateViolation { name, .. } => Some(format!(
            "  !! {} refused: account and contact are not verified yet",
            name
        )),
        AgentEvent::StateChanged { .. } | AgentEvent::Response(_) => None,
    }
}
