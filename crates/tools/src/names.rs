//! Closed set of tool names

use std::fmt;
use std::str::FromStr;

use visit_agent_core::UploadMode;

/// Every tool the model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    FindAccountByName,
    ListContactsForAccount,
    UploadVisitReport,
    PrepareForUpload,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::FindAccountByName => "find_account_by_name",
            ToolName::ListContactsForAccount => "list_contacts_for_account",
            ToolName::UploadVisitReport => "upload_visit_report",
            ToolName::PrepareForUpload => "prepare_for_upload",
        }
    }

    /// Tools that finish a report and therefore require verified entities
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolName::UploadVisitReport | ToolName::PrepareForUpload)
    }

    /// Tools published in a deployment
    pub fn published(mode: UploadMode) -> [ToolName; 3] {
        let terminal = match mode {
            UploadMode::Upload => ToolName::UploadVisitReport,
            UploadMode::Prepare => ToolName::PrepareForUpload,
        };
        [ToolName::FindAccountByName, ToolName::ListContactsForAccount, terminal]
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "find_account_by_name" => Ok(ToolName::FindAccountByName),
            "list_contacts_for_account" => Ok(ToolName::ListContactsForAccount),
            "upload_visit_report" => Ok(ToolName::UploadVisitReport),
            "prepare_for_upload" => Ok(ToolName::PrepareForUpload),
            other => Err(format!("unknown tool '{}'", other)),
        }
    }
}
