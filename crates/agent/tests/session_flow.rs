//! End-to-end session tests with a scripted model and a counting CRM.
//!
//! No network or audio devices are touched.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use visit_agent_agent::{
    AgentError, AgentEvent, SessionState, ToolGate, UserInput, VisitSession,
};
use visit_agent_core::{
    AudioSink, CapturedAudio, EventStream, ModelConnection, Result, StreamEvent, ToolDefinition,
    UploadMode, UserContent, UtteranceCapture,
};
use visit_agent_tools::{
    AccountLookup, ContactList, CreatedRecord, CrmIntegration, IntegrationError,
    StubCrmIntegration, UploadRequest,
};

#[derive(Default)]
struct ModelLog {
    triggers: usize,
    user_messages: Vec<UserContent>,
    tool_outputs: Vec<(String, String)>,
    event_reads: usize,
}

/// Plays back one queued event list per model turn
struct ScriptedModel {
    turns: VecDeque<Vec<StreamEvent>>,
    log: Arc<Mutex<ModelLog>>,
}

impl ScriptedModel {
    fn new(turns: Vec<Vec<StreamEvent>>) -> (Self, Arc<Mutex<ModelLog>>) {
        let log = Arc::new(Mutex::new(ModelLog::default()));
        let model = Self {
            turns: turns.into(),
            log: Arc::clone(&log),
        };
        (model, log)
    }
}

#[async_trait]
impl ModelConnection for ScriptedModel {
    async fn configure(&mut self, _instructions: &str, _tools: &[ToolDefinition]) -> Result<()> {
        Ok(())
    }

    async fn append_user_message(&mut self, content: UserContent) -> Result<()> {
        self.log.lock().unwrap().user_messages.push(content);
        Ok(())
    }

    async fn append_tool_output(&mut self, call_id: &str, output: &str) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .tool_outputs
            .push((call_id.to_string(), output.to_string()));
        Ok(())
    }

    async fn trigger_generation(&mut self) -> Result<()> {
        self.log.lock().unwrap().triggers += 1;
        Ok(())
    }

    fn events(&mut self) -> EventStream<'_> {
        self.log.lock().unwrap().event_reads += 1;
        let events = self.turns.pop_front().unwrap_or_default();
        Box::pin(futures::stream::iter(events.into_iter().map(Ok)))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Stub CRM that counts every operation
#[derive(Default)]
struct CountingCrm {
    inner: StubCrmIntegration,
    find_calls: AtomicUsize,
    list_calls: AtomicUsize,
    upload_calls: AtomicUsize,
}

impl CountingCrm {
    fn total(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
            + self.list_calls.load(Ordering::SeqCst)
            + self.upload_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrmIntegration for CountingCrm {
    async fn find_account(&self, name: &str) -> std::result::Result<AccountLookup, IntegrationError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_account(name).await
    }

    async fn list_contacts(
        &self,
        account_name: &str,
    ) -> std::result::Result<ContactList, IntegrationError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_contacts(account_name).await
    }

    async fn upload(
        &self,
        request: UploadRequest,
    ) -> std::result::Result<CreatedRecord, IntegrationError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.upload(request).await
    }
}

/// CRM whose account search is down; contacts still answer
#[derive(Default)]
struct FailingCrm {
    inner: StubCrmIntegration,
}

#[async_trait]
impl CrmIntegration for FailingCrm {
    async fn find_account(&self, _name: &str) -> std::result::Result<AccountLookup, IntegrationError> {
        Err(IntegrationError::ConnectionFailed("crm unreachable".into()))
    }

    async fn list_contacts(
        &self,
        account_name: &str,
    ) -> std::result::Result<ContactList, IntegrationError> {
        self.inner.list_contacts(account_name).await
    }

    async fn upload(
        &self,
        request: UploadRequest,
    ) -> std::result::Result<CreatedRecord, IntegrationError> {
        self.inner.upload(request).await
    }
}

fn tool_call(call_id: &str, name: &str, arguments: serde_json::Value) -> Vec<StreamEvent> {
    vec![
        StreamEvent::ToolArgsFragment {
            call_id: call_id.into(),
            delta: arguments.to_string(),
        },
        StreamEvent::ToolNameResolved {
            call_id: call_id.into(),
            name: name.into(),
        },
    ]
}

fn tool_turn(calls: Vec<Vec<StreamEvent>>) -> Vec<StreamEvent> {
    let mut events: Vec<StreamEvent> = calls.into_iter().flatten().collect();
    events.push(StreamEvent::TurnComplete);
    events
}

fn answer(text: &str) -> Vec<StreamEvent> {
    vec![
        StreamEvent::TranscriptComplete(format!("  {}  ", text)),
        StreamEvent::TurnComplete,
    ]
}

fn report_args() -> serde_json::Value {
    json!({
        "account_name": "igus GmbH",
        "primary_contact": "Max Mustermann",
        "date": "2024-05-14",
        "location": "Client",
        "division": "e-chain",
        "subject": "Line review",
        "description": "Reviewed e-chain wear on the packaging line",
        "machines": null
    })
}

fn session(
    turns: Vec<Vec<StreamEvent>>,
    crm: Arc<CountingCrm>,
) -> (VisitSession, Arc<Mutex<ModelLog>>) {
    let (model, log) = ScriptedModel::new(turns);
    let gate = ToolGate::new(crm, UploadMode::Upload);
    (VisitSession::new(Box::new(model), gate), log)
}

#[tokio::test]
async fn test_bogus_mode_fails_before_model() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(vec![answer("unused")], crm);

    let result = session.interact_mode("bogus_mode", Some("x")).await;
    assert!(matches!(result, Err(AgentError::InvalidInput(_))));

    let log = log.lock().unwrap();
    assert_eq!(log.triggers, 0);
    assert!(log.user_messages.is_empty());
    assert_eq!(log.event_reads, 0);
    assert_eq!(session.state(), SessionState::AwaitingInput);
}

#[tokio::test]
async fn test_text_turn_returns_trimmed_answer() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(vec![answer("Which company did you visit?")], crm.clone());
    let mut events = session.subscribe();

    let text = session
        .interact_mode("text", Some("I want to file a report"))
        .await
        .unwrap();
    assert_eq!(text, "Which company did you visit?");

    let log = log.lock().unwrap();
    assert_eq!(log.triggers, 1);
    assert_eq!(
        log.user_messages,
        vec![UserContent::Text("I want to file a report".to_string())]
    );
    assert_eq!(crm.total(), 0);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind());
    }
    assert_eq!(kinds, vec!["state_changed", "state_changed", "response"]);
}

#[tokio::test]
async fn test_one_lookup_then_answer() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(
        vec![
            tool_turn(vec![tool_call(
                "call_1",
                "find_account_by_name",
                json!({"account_name": "igus GmbH"}),
            )]),
            answer("I found igus GmbH. Who did you meet?"),
        ],
        crm.clone(),
    );

    let text = session
        .interact(UserInput::Text("Visit at igus GmbH".into()))
        .await
        .unwrap();
    assert_eq!(text, "I found igus GmbH. Who did you meet?");

    let log = log.lock().unwrap();
    assert_eq!(log.triggers, 2);
    assert_eq!(crm.find_calls.load(Ordering::SeqCst), 1);
    assert_eq!(crm.total(), 1);
    assert_eq!(log.tool_outputs.len(), 1);
    assert_eq!(log.tool_outputs[0].0, "call_1");
    assert!(log.tool_outputs[0].1.contains("single_found"));
    assert!(session.validation().account_verified());
}

#[tokio::test]
async fn test_batch_triggers_generation_once() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(
        vec![
            tool_turn(vec![
                tool_call("call_1", "find_account_by_name", json!({"account_name": "igus GmbH"})),
                tool_call(
                    "call_2",
                    "list_contacts_for_account",
                    json!({"account_name": "igus GmbH", "contact_name": "Max"}),
                ),
            ]),
            answer("Both verified."),
        ],
        crm.clone(),
    );

    session.interact(UserInput::Text("igus GmbH with Max".into())).await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.triggers, 2);
    let ids: Vec<&str> = log.tool_outputs.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["call_1", "call_2"]);
    assert!(session.validation().is_ready());
}

#[tokio::test]
async fn test_upload_blocked_until_verified() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(
        vec![
            tool_turn(vec![tool_call("call_1", "upload_visit_report", report_args())]),
            answer("I need to verify the account first."),
        ],
        crm.clone(),
    );
    let mut events = session.subscribe();

    session.interact(UserInput::Text("Upload it".into())).await.unwrap();

    assert_eq!(crm.total(), 0);
    let log = log.lock().unwrap();
    let output: serde_json::Value = serde_json::from_str(&log.tool_outputs[0].1).unwrap();
    assert_eq!(output["status"], "error");
    assert_eq!(output["code"], "precondition_failed");

    let mut saw_violation = false;
    while let Ok(event) = events.try_recv() {
        if let AgentEvent::GateViolation { call_id, .. } = event {
            assert_eq!(call_id, "call_1");
            saw_violation = true;
        }
    }
    assert!(saw_violation);
}

#[tokio::test]
async fn test_upload_after_verification_reaches_crm_once() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(
        vec![
            tool_turn(vec![
                tool_call("call_1", "find_account_by_name", json!({"account_name": "igus GmbH"})),
                tool_call(
                    "call_2",
                    "list_contacts_for_account",
                    json!({"account_name": "igus GmbH", "contact_name": "max mustermann"}),
                ),
            ]),
            tool_turn(vec![tool_call("call_3", "upload_visit_report", report_args())]),
            answer("The report was uploaded. Another one?"),
        ],
        crm.clone(),
    );

    let text = session
        .interact(UserInput::Text("Yes, upload it".into()))
        .await
        .unwrap();
    assert_eq!(text, "The report was uploaded. Another one?");
    assert_eq!(crm.upload_calls.load(Ordering::SeqCst), 1);

    let uploads = crm.inner.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1.account_id, "A001");
    assert_eq!(uploads[0].1.contact_id.as_deref(), Some("C001"));

    let log = log.lock().unwrap();
    assert_eq!(log.triggers, 3);
    assert!(log.tool_outputs[2].1.contains("record_id"));
}

#[tokio::test]
async fn test_contact_before_account_still_uploads() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(
        vec![
            tool_turn(vec![tool_call(
                "call_1",
                "list_contacts_for_account",
                json!({"account_name": "igus GmbH", "contact_name": "Max Mustermann"}),
            )]),
            tool_turn(vec![tool_call(
                "call_2",
                "find_account_by_name",
                json!({"account_name": "igus GmbH"}),
            )]),
            tool_turn(vec![tool_call("call_3", "upload_visit_report", report_args())]),
            answer("Uploaded."),
        ],
        crm.clone(),
    );

    let text = session.interact(UserInput::Text("Max at igus".into())).await.unwrap();
    assert_eq!(text, "Uploaded.");
    assert!(session.validation().is_ready());
    assert_eq!(crm.upload_calls.load(Ordering::SeqCst), 1);

    let uploads = crm.inner.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1.account_id, "A001");
    assert_eq!(uploads[0].1.contact_id.as_deref(), Some("C001"));

    let log = log.lock().unwrap();
    assert_eq!(log.triggers, 4);
    assert!(log.tool_outputs[2].1.contains("record_id"));
}

#[tokio::test]
async fn test_contact_of_other_account_blocks_upload() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(
        vec![
            tool_turn(vec![
                tool_call("call_1", "find_account_by_name", json!({"account_name": "igus GmbH"})),
                tool_call(
                    "call_2",
                    "list_contacts_for_account",
                    json!({"account_name": "igus North America", "contact_name": "John"}),
                ),
            ]),
            tool_turn(vec![tool_call("call_3", "upload_visit_report", report_args())]),
            answer("John is not a contact at igus GmbH."),
        ],
        crm.clone(),
    );

    session.interact(UserInput::Text("John at igus GmbH".into())).await.unwrap();

    assert!(!session.validation().is_ready());
    assert_eq!(crm.upload_calls.load(Ordering::SeqCst), 0);
    let log = log.lock().unwrap();
    let output: serde_json::Value = serde_json::from_str(&log.tool_outputs[2].1).unwrap();
    assert_eq!(output["code"], "precondition_failed");
}

#[tokio::test]
async fn test_failing_crm_call_is_answered_in_batch() {
    let (model, log) = ScriptedModel::new(vec![
        tool_turn(vec![
            tool_call("call_1", "find_account_by_name", json!({"account_name": "igus GmbH"})),
            tool_call(
                "call_2",
                "list_contacts_for_account",
                json!({"account_name": "igus GmbH", "contact_name": "Max"}),
            ),
        ]),
        answer("The CRM is not reachable right now."),
    ]);
    let gate = ToolGate::new(Arc::new(FailingCrm::default()), UploadMode::Upload);
    let mut session = VisitSession::new(Box::new(model), gate);
    let mut events = session.subscribe();

    let text = session.interact(UserInput::Text("igus GmbH with Max".into())).await.unwrap();
    assert_eq!(text, "The CRM is not reachable right now.");

    let log = log.lock().unwrap();
    assert_eq!(log.triggers, 2);
    let ids: Vec<&str> = log.tool_outputs.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["call_1", "call_2"]);
    let failed: serde_json::Value = serde_json::from_str(&log.tool_outputs[0].1).unwrap();
    assert_eq!(failed["status"], "error");
    assert!(log.tool_outputs[1].1.contains("C001"));

    assert!(!session.validation().account_verified());
    assert!(session.validation().contact_verified());
    assert!(!session.validation().is_ready());

    let mut tool_errors = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let AgentEvent::ToolError { call_id, .. } = event {
            tool_errors.push(call_id);
        }
    }
    assert_eq!(tool_errors, vec!["call_1".to_string()]);
}

#[tokio::test]
async fn test_nameless_tool_batch_asks_again() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(
        vec![
            vec![
                StreamEvent::ToolArgsFragment {
                    call_id: "call_1".into(),
                    delta: "{}".into(),
                },
                StreamEvent::TurnComplete,
            ],
            answer("Could you repeat that?"),
        ],
        crm.clone(),
    );

    let text = session.interact(UserInput::Text("hm".into())).await.unwrap();
    assert_eq!(text, "Could you repeat that?");
    let log = log.lock().unwrap();
    assert_eq!(log.triggers, 2);
    assert!(log.tool_outputs.is_empty());
    assert_eq!(crm.total(), 0);
}

#[tokio::test]
async fn test_ambiguous_lookup_clears_verification() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, _log) = session(
        vec![
            tool_turn(vec![tool_call(
                "call_1",
                "find_account_by_name",
                json!({"account_name": "igus North America"}),
            )]),
            answer("Found it."),
            tool_turn(vec![tool_call("call_2", "find_account_by_name", json!({"account_name": "igus"}))]),
            answer("Which igus did you mean?"),
        ],
        crm,
    );

    session.interact(UserInput::Text("igus North America".into())).await.unwrap();
    assert!(session.validation().account_verified());
    assert_eq!(session.validation().verified_account_id(), Some("A002"));

    session.interact(UserInput::Text("actually just igus".into())).await.unwrap();
    assert!(!session.validation().account_verified());
    assert_eq!(session.validation().verified_account_id(), None);
}

#[tokio::test]
async fn test_unknown_tool_is_answered() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(
        vec![
            tool_turn(vec![tool_call("call_1", "delete_everything", json!({}))]),
            answer("Sorry, I can't do that."),
        ],
        crm.clone(),
    );

    session.interact(UserInput::Text("delete".into())).await.unwrap();
    let log = log.lock().unwrap();
    assert_eq!(log.tool_outputs.len(), 1);
    assert!(log.tool_outputs[0].1.contains("unknown_tool"));
    assert_eq!(crm.total(), 0);
}

#[tokio::test]
async fn test_tool_round_limit() {
    let crm = Arc::new(CountingCrm::default());
    let lookup = || {
        tool_turn(vec![tool_call("call_x", "find_account_by_name", json!({"account_name": "igus GmbH"}))])
    };
    let (model, _log) = ScriptedModel::new(vec![lookup(), lookup(), lookup()]);
    let mut session = VisitSession::new(Box::new(model), ToolGate::new(crm.clone(), UploadMode::Upload))
        .with_max_tool_rounds(Some(2));

    let result = session.interact(UserInput::Text("loop".into())).await;
    assert!(matches!(result, Err(AgentError::Model(_))));
    assert_eq!(crm.find_calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.state(), SessionState::AwaitingInput);
}

#[tokio::test]
async fn test_stream_closed_mid_turn() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, _log) = session(
        vec![vec![StreamEvent::TranscriptComplete("partial".into())]],
        crm,
    );

    let result = session.interact(UserInput::Text("hello".into())).await;
    assert!(matches!(result, Err(AgentError::Model(_))));
}

struct FixedCapture;

impl UtteranceCapture for FixedCapture {
    fn capture(&mut self) -> Result<CapturedAudio> {
        Ok(CapturedAudio {
            samples: vec![0; 480],
            sample_rate: 16000,
            frames: 1,
            speech_frames: 1,
            truncated: false,
        })
    }
}

struct RecordingSink(Arc<Mutex<Vec<Vec<u8>>>>);

impl AudioSink for RecordingSink {
    fn play(&mut self, fragments: &[Vec<u8>]) -> Result<()> {
        self.0.lock().unwrap().extend(fragments.iter().cloned());
        Ok(())
    }
}

#[tokio::test]
async fn test_voice_turn_sends_wav_and_plays_answer() {
    let crm = Arc::new(CountingCrm::default());
    let played = Arc::new(Mutex::new(Vec::new()));
    let (model, log) = ScriptedModel::new(vec![vec![
        StreamEvent::AudioFragment(vec![1, 0, 2, 0]),
        StreamEvent::AudioFragment(vec![3, 0]),
        StreamEvent::TranscriptComplete("Hello!".into()),
        StreamEvent::TurnComplete,
    ]]);
    let mut session = VisitSession::new(Box::new(model), ToolGate::new(crm, UploadMode::Upload))
        .with_capture(Box::new(FixedCapture))
        .with_sink(Box::new(RecordingSink(Arc::clone(&played))));

    let text = session.interact_mode("voice", None).await.unwrap();
    assert_eq!(text, "Hello!");

    let log = log.lock().unwrap();
    match &log.user_messages[0] {
        UserContent::Audio(wav) => assert_eq!(&wav[..4], b"RIFF"),
        other => panic!("expected audio, got {:?}", other),
    }
    assert_eq!(*played.lock().unwrap(), vec![vec![1, 0, 2, 0, 3, 0]]);
}

#[tokio::test]
async fn test_voice_without_capture_is_device_error() {
    let crm = Arc::new(CountingCrm::default());
    let (mut session, log) = session(vec![answer("unused")], crm);

    let result = session.interact(UserInput::Voice).await;
    assert!(matches!(result, Err(AgentError::Device(_))));
    assert_eq!(log.lock().unwrap().triggers, 0);

    // text still works afterwards
    assert!(session.interact(UserInput::Text("hi".into())).await.is_ok());
}
