//! CRM integration
//!
//! The trait is the seam to the customer system. `StubCrmIntegration`
//! serves a fixed in-memory data set for development and tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use visit_agent_core::VisitReport;

use crate::schema::ToolError;

/// Integration errors
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<IntegrationError> for ToolError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::NotFound(msg) => ToolError::not_found(msg),
            IntegrationError::InvalidRequest(msg) => ToolError::invalid_params(msg),
            IntegrationError::RateLimited => ToolError::internal("Rate limited - please retry later"),
            _ => ToolError::internal(err.to_string()),
        }
    }
}

impl From<IntegrationError> for visit_agent_core::Error {
    fn from(err: IntegrationError) -> Self {
        visit_agent_core::Error::Integration(err.to_string())
    }
}

/// Account reference returned on ambiguous lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMatch {
    pub name: String,
    pub id: String,
}

/// Outcome of an account search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccountLookup {
    SingleFound {
        account_id: String,
        account_name: String,
    },
    MultipleFound {
        matched_accounts: Vec<AccountMatch>,
    },
    NotFound,
}

impl AccountLookup {
    pub fn single_id(&self) -> Option<&str> {
        match self {
            AccountLookup::SingleFound { account_id, .. } => Some(account_id),
            _ => None,
        }
    }
}

/// A contact of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub id: String,
}

/// Contacts of one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactList {
    pub contacts: Vec<Contact>,
}

impl ContactList {
    /// Contacts whose name contains `requested`, ignoring case
    pub fn find_matching(&self, requested: &str) -> Vec<&Contact> {
        let needle = requested.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.contacts
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

/// A report ready to be written, bound to verified ids
#[derive(Debug, Clone, Serialize)]
pub struct UploadRequest {
    pub account_id: String,
    pub contact_id: Option<String>,
    pub report: VisitReport,
}

/// Record created by an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub id: String,
}

/// CRM operations used by the tools
#[async_trait]
pub trait CrmIntegration: Send + Sync {
    /// Search accounts by name
    async fn find_account(&self, name: &str) -> Result<AccountLookup, IntegrationError>;

    /// List the contacts of an account
    async fn list_contacts(&self, account_name: &str) -> Result<ContactList, IntegrationError>;

    /// Write a visit report
    async fn upload(&self, request: UploadRequest) -> Result<CreatedRecord, IntegrationError>;
}

struct StubAccount {
    id: &'static str,
    name: &'static str,
    contacts: &'static [(&'static str, &'static str, &'static str)],
}

const STUB_ACCOUNTS: &[StubAccount] = &[
    StubAccount {
        id: "A001",
        name: "igus GmbH",
        contacts: &[
            ("C001", "Max Mustermann", "max@igus.de"),
            ("C002", "Erika Beispiel", "erika@igus.de"),
        ],
    },
    StubAccount {
        id: "A002",
        name: "igus North America",
        contacts: &[
            ("C003", "John Doe", "john@igus.com"),
            ("C004", "Jane Smith", "jane@igus.com"),
        ],
    },
];

/// Stub CRM implementation for development/testing
#[derive(Default)]
pub struct StubCrmIntegration {
    uploads: Mutex<Vec<(CreatedRecord, UploadRequest)>>,
}

impl StubCrmIntegration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports written so far
    pub fn uploads(&self) -> Vec<(CreatedRecord, UploadRequest)> {
        self.uploads.lock().clone()
    }

    fn matching_accounts(name: &str) -> Vec<&'static StubAccount> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        STUB_ACCOUNTS
            .iter()
            .filter(|a| a.name.to_lowercase().contains(&needle))
            .collect()
    }
}

#[async_trait]
impl CrmIntegration for StubCrmIntegration {
    async fn find_account(&self, name: &str) -> Result<AccountLookup, IntegrationError> {
        let matches = Self::matching_accounts(name);
        tracing::info!(query = %name, matches = matches.len(), "Stub CRM: Find account");

        Ok(match matches.as_slice() {
            [] => AccountLookup::NotFound,
            [only] => AccountLookup::SingleFound {
                account_id: only.id.to_string(),
                account_name: only.name.to_string(),
            },
            many => AccountLookup::MultipleFound {
                matched_accounts: many
                    .iter()
                    .map(|a| AccountMatch {
                        name: a.name.to_string(),
                        id: a.id.to_string(),
                    })
                    .collect(),
            },
        })
    }

    async fn list_contacts(&self, account_name: &str) -> Result<ContactList, IntegrationError> {
        let wanted = account_name.trim().to_lowercase();
        let account = STUB_ACCOUNTS
            .iter()
            .find(|a| a.name.to_lowercase() == wanted)
            .or_else(|| match Self::matching_accounts(account_name).as_slice() {
                [only] => Some(*only),
                _ => None,
            });

        let contacts = account
            .map(|a| {
                a.contacts
                    .iter()
                    .map(|(id, name, email)| Contact {
                        name: name.to_string(),
                        email: email.to_string(),
                        id: id.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let list = ContactList { contacts };
        tracing::info!(account = %account_name, contacts = list.contacts.len(), "Stub CRM: List contacts");
        Ok(list)
    }

    async fn upload(&self, request: UploadRequest) -> Result<CreatedRecord, IntegrationError> {
        let record = CreatedRecord {
            id: uuid::Uuid::new_v4().to_string(),
        };
        tracing::info!(
            record_id = %record.id,
            account_id = %request.account_id,
            subject = %request.report.subject,
            "Stub CRM: Uploaded visit report"
        );
        self.uploads.lock().push((record.clone(), request));
        Ok(record)
    }
}
