//! Visit report agent: terminal front end

mod repl;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use visit_agent_agent::{AgentError, UserInput, VisitSession};
use visit_agent_config::{load_settings, Settings};
use visit_agent_core::ConversationHistory;
use visit_agent_tools::StubCrmIntegration;

use crate::repl::{render_history, render_tool_event, Command, HELP};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    // Priority: env vars > config/{env}.toml > config/default.toml > defaults
    let env = std::env::var("VISIT_AGENT_ENV").ok();
    let settings = load_settings(env.as_deref()).context("failed to load configuration")?;

    init_tracing(&settings);
    tracing::info!("Starting Visit Report Agent v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?settings.environment,
        provider = ?settings.realtime.provider,
        upload_mode = ?settings.agent.upload_mode,
        "Configuration loaded"
    );

    let crm = Arc::new(StubCrmIntegration::new());
    let mut session = VisitSession::connect(&settings, crm)
        .await
        .context("failed to start realtime session")?;

    let mut events = BroadcastStream::new(session.subscribe());
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if let Ok(event) = event {
                if let Some(line) = render_tool_event(&event) {
                    println!("{}", line);
                }
            }
        }
    });

    let mut history = ConversationHistory::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", HELP);
    loop {
        prompt("> ")?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let input = match Command::parse(&line) {
            Command::Quit => break,
            Command::Help => {
                println!("{}", HELP);
                continue;
            },
            Command::History => {
                println!("{}", render_history(&history));
                continue;
            },
            Command::Clear => {
                history.clear();
                println!("Conversation cleared.");
                continue;
            },
            Command::Unknown(other) => {
                println!("Unknown command '{}'. Type h for help.", other);
                continue;
            },
            Command::Text(Some(text)) => UserInput::from_mode("text", Some(&text)),
            Command::Text(None) => {
                prompt("message: ")?;
                let text = lines.next_line().await?.unwrap_or_default();
                UserInput::from_mode("text", Some(&text))
            },
            Command::Voice => {
                println!("Listening... stop talking to send.");
                Ok(UserInput::Voice)
            },
        };

        let input = match input {
            Ok(input) => input,
            Err(e) => {
                println!("{}", e);
                continue;
            },
        };

        match &input {
            UserInput::Text(text) => history.push_user(text.clone()),
            UserInput::Voice => history.push_user("(voice message)"),
        }

        match session.interact(input).await {
            Ok(text) => {
                println!("agent: {}", text);
                history.push_assistant(text);
            },
            Err(AgentError::Device(msg)) => {
                println!("Audio device problem: {}. Text messages still work.", msg);
            },
            Err(e) => println!("Error: {}", e),
        }
    }

    tracing::info!(session_id = %session.session_id(), turns = history.len(), "Session ended");
    Ok(())
}

fn prompt(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", text)?;
    stdout.flush()
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("visit_agent={}", level).into()
    });

    // stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer(config.observability.log_json, std::io::stderr))
        .init();
}

fn fmt_layer<S, W>(json: bool, writer: W) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(writer).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn log_with(json: bool) -> String {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber =
            tracing_subscriber::registry().with(fmt_layer(json, move || sink.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(call_id = "call_1", "Tool succeeded");
        });
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_json_logs_use_given_writer() {
        let output = log_with(true);
        let line: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(line["fields"]["message"], "Tool succeeded");
        assert_eq!(line["fields"]["call_id"], "call_1");
    }

    #[test]
    fn test_plain_logs_use_given_writer() {
        let output = log_with(false);
        assert!(output.contains("Tool succeeded"));
        assert!(output.contains("call_1"));
    }
}
