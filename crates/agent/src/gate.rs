//! Tool Invocation Gate
//!
//! Dispatches the model's tool calls to the CRM and tracks which account
//! and contact have been verified. Report-finishing tools are refused
//! until both are verified.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use visit_agent_core::{ToolCall, UploadMode};
use visit_agent_tools::{
    parse_arguments, AccountLookup, CrmIntegration, FindAccountArgs, IntegrationError,
    ListContactsArgs, ToolError, ToolName, UploadRequest, VisitReportArgs,
    DEFAULT_TOOL_TIMEOUT_SECS,
};

/// What the gate has verified so far in this session
///
/// Only [`ToolGate`] mutates this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationState {
    account_verified: bool,
    contact_verified: bool,
    verified_account_id: Option<String>,
    verified_account_name: Option<String>,
    verified_contact_id: Option<String>,
    /// Account the verified contact was listed under
    contact_account: Option<String>,
}

fn same_account(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl ValidationState {
    pub fn account_verified(&self) -> bool {
        self.account_verified
    }

    pub fn contact_verified(&self) -> bool {
        self.contact_verified
    }

    pub fn verified_account_id(&self) -> Option<&str> {
        self.verified_account_id.as_deref()
    }

    pub fn verified_contact_id(&self) -> Option<&str> {
        self.verified_contact_id.as_deref()
    }

    /// True when the verified contact was listed under the verified account
    pub fn contact_matches_account(&self) -> bool {
        match (&self.verified_account_name, &self.contact_account) {
            (Some(account), Some(listed)) => same_account(account, listed),
            _ => false,
        }
    }

    /// Account and contact verified, and the contact belongs to the account
    pub fn is_ready(&self) -> bool {
        self.account_verified && self.contact_verified && self.contact_matches_account()
    }

    fn verify_account(&mut self, account_id: &str, account_name: &str) {
        // contacts verified for a previously verified, different account no longer apply
        if matches!(self.verified_account_id.as_deref(), Some(prev) if prev != account_id) {
            self.reset_contact();
        }
        self.account_verified = true;
        self.verified_account_id = Some(account_id.to_string());
        self.verified_account_name = Some(account_name.to_string());
    }

    fn reset_account(&mut self) {
        self.account_verified = false;
        self.verified_account_id = None;
        self.verified_account_name = None;
    }

    fn verify_contact(&mut self, contact_id: &str, account_name: &str) {
        self.contact_verified = true;
        self.verified_contact_id = Some(contact_id.to_string());
        self.contact_account = Some(account_name.to_string());
    }

    fn reset_contact(&mut self) {
        self.contact_verified = false;
        self.verified_contact_id = None;
        self.contact_account = None;
    }
}

/// Result of dispatching one call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    /// The tool ran (or could not be parsed) and failed
    Failed(ToolError),
    /// Refused by the gate; the CRM was not contacted
    Blocked(ToolError),
}

impl ToolOutcome {
    /// Payload fed back to the model
    pub fn output(&self) -> Value {
        match self {
            ToolOutcome::Success(value) => value.clone(),
            ToolOutcome::Failed(err) | ToolOutcome::Blocked(err) => err.to_output(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, ToolOutcome::Blocked(_))
    }
}

const VERIFY_FIRST: &str = "The account and the contact must be validated with \
find_account_by_name and list_contacts_for_account before the report can be finished.";

/// Validation-gated tool dispatcher, one per session
pub struct ToolGate {
    crm: Arc<dyn CrmIntegration>,
    upload_mode: UploadMode,
    timeout: Duration,
    state: ValidationState,
}

impl ToolGate {
    pub fn new(crm: Arc<dyn CrmIntegration>, upload_mode: UploadMode) -> Self {
        Self {
            crm,
            upload_mode,
            timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            state: ValidationState::default(),
        }
    }

    /// Bound every CRM call by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> &ValidationState {
        &self.state
    }

    pub fn upload_mode(&self) -> UploadMode {
        self.upload_mode
    }

    /// Execute one call
    ///
    /// Never fails: every error becomes an outcome whose output is sent to
    /// the model, and verification flags are left untouched on failure.
    pub async fn dispatch(&mut self, call: &ToolCall) -> ToolOutcome {
        let name = match self.resolve(&call.name) {
            Some(name) => name,
            None => {
                tracing::warn!(call_id = %call.id, tool = %call.name, "Model called an unknown tool");
                return ToolOutcome::Failed(ToolError::unknown_tool(&call.name));
            },
        };

        if name.is_terminal() && !self.state.is_ready() {
            tracing::warn!(
                call_id = %call.id,
                tool = %name,
                account_verified = self.state.account_verified,
                contact_verified = self.state.contact_verified,
                contact_matches = self.state.contact_matches_account(),
                "Gate refused report before verification"
            );
            return ToolOutcome::Blocked(ToolError::precondition(VERIFY_FIRST));
        }

        let result = match name {
            ToolName::FindAccountByName => self.find_account(&call.arguments).await,
            ToolName::ListContactsForAccount => self.list_contacts(&call.arguments).await,
            ToolName::UploadVisitReport => self.upload(&call.arguments).await,
            ToolName::PrepareForUpload => self.prepare(&call.arguments),
        };

        match result {
            Ok(output) => {
                tracing::debug!(call_id = %call.id, tool = %name, "Tool succeeded");
                ToolOutcome::Success(output)
            },
            Err(err) => {
                metrics::counter!("visit_agent_tool_errors_total", "tool" => name.as_str())
                    .increment(1);
                tracing::warn!(call_id = %call.id, tool = %name, error = %err, "Tool failed");
                ToolOutcome::Failed(err)
            },
        }
    }

    /// Map a called name onto a tool published in this deployment
    fn resolve(&self, called: &str) -> Option<ToolName> {
        let name = called.parse::<ToolName>().ok()?;
        ToolName::published(self.upload_mode)
            .contains(&name)
            .then_some(name)
    }

    async fn call_crm<T, F>(&self, name: ToolName, call: F) -> Result<T, ToolError>
    where
        F: std::future::Future<Output = Result<T, IntegrationError>>,
    {
        metrics::counter!("visit_agent_tool_calls_total", "tool" => name.as_str()).increment(1);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(ToolError::from),
            Err(_elapsed) => Err(ToolError::timeout(name.as_str(), self.timeout.as_secs())),
        }
    }

    async fn find_account(&mut self, arguments: &Value) -> Result<Value, ToolError> {
        let name = ToolName::FindAccountByName;
        let args: FindAccountArgs = parse_arguments(name, arguments)?;
        let lookup = self
            .call_crm(name, self.crm.find_account(&args.account_name))
            .await?;

        match &lookup {
            AccountLookup::SingleFound {
                account_id,
                account_name,
            } => {
                tracing::info!(account_id = %account_id, "Account verified");
                self.state.verify_account(account_id, account_name);
            },
            _ => self.state.reset_account(),
        }

        serde_json::to_value(&lookup).map_err(|e| ToolError::internal(e.to_string()))
    }

    async fn list_contacts(&mut self, arguments: &Value) -> Result<Value, ToolError> {
        let name = ToolName::ListContactsForAccount;
        let args: ListContactsArgs = parse_arguments(name, arguments)?;
        let list = self
            .call_crm(name, self.crm.list_contacts(&args.account_name))
            .await?;

        let matched = args
            .requested_contact()
            .and_then(|requested| list.find_matching(requested).first().map(|c| c.id.clone()));
        match matched {
            Some(contact_id) => {
                tracing::info!(
                    contact_id = %contact_id,
                    account = %args.account_name,
                    "Contact verified"
                );
                self.state.verify_contact(&contact_id, &args.account_name);
            },
            None => self.state.reset_contact(),
        }

        serde_json::to_value(&list).map_err(|e| ToolError::internal(e.to_string()))
    }

    async fn upload(&mut self, arguments: &Value) -> Result<Value, ToolError> {
        let name = ToolName::UploadVisitReport;
        let args: VisitReportArgs = parse_arguments(name, arguments)?;
        let report = args.to_report()?;
        let account_id = self
            .state
            .verified_account_id
            .clone()
            .ok_or_else(|| ToolError::precondition(VERIFY_FIRST))?;

        let request = UploadRequest {
            account_id,
            contact_id: self.state.verified_contact_id.clone(),
            report,
        };
        let record = self.call_crm(name, self.crm.upload(request)).await?;
        tracing::info!(record_id = %record.id, "Visit report uploaded");

        Ok(json!({
            "status": "success",
            "record_id": record.id,
        }))
    }

    fn prepare(&self, arguments: &Value) -> Result<Value, ToolError> {
        let args: VisitReportArgs = parse_arguments(ToolName::PrepareForUpload, arguments)?;
        let report = args.to_report()?;
        tracing::info!(subject = %report.subject, "Visit report prepared");

        Ok(json!({
            "status": "prepared",
            "account_id": self.state.verified_account_id,
            "contact_id": self.state.verified_contact_id,
            "record": report,
        }))
    }
}
