//! Tool definitions and typed, schema-validated arguments

use std::collections::HashMap;

use chrono::NaiveDate;
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use visit_agent_core::{ToolDefinition, UploadMode, VisitReport};

use crate::names::ToolName;
use crate::schema::{ToolBuilder, ToolError};

fn report_builder(name: ToolName, description: &str) -> ToolBuilder {
    ToolBuilder::new(name.as_str(), description)
        .string("account_name", "Company the meeting was with.", true)
        .string("primary_contact", "Primary contact person for the meeting.", true)
        .date("date", "Date of the meeting (YYYY-MM-DD).", true)
        .string(
            "location",
            "Location of the meeting: Remote, Client, At igus or Other.",
            true,
        )
        .string(
            "division",
            "Division involved: e-chain, bearings or e-chain&bearings.",
            true,
        )
        .string("subject", "Subject or title of the meeting.", true)
        .string("description", "Short summary of the meeting.", true)
        .nullable_string("machines", "Optional: machines discussed during the meeting.")
}

/// Definition published to the model for one tool
pub fn tool_definition(name: ToolName) -> ToolDefinition {
    match name {
        ToolName::FindAccountByName => ToolBuilder::new(
            name.as_str(),
            "Searches accounts/companies by name to prove their validity.",
        )
        .string("account_name", "Company name as the user said it.", true)
        .build(),
        ToolName::ListContactsForAccount => ToolBuilder::new(
            name.as_str(),
            "Lists contacts for an account/company to prove a contact's validity.",
        )
        .string("account_name", "Company the contact works for.", true)
        .string(
            "contact_name",
            "Contact the user mentioned; omit to list all contacts.",
            false,
        )
        .build(),
        ToolName::UploadVisitReport => report_builder(
            name,
            "Uploads a confirmed visit report to the CRM. Account and contact must be verified first.",
        )
        .build(),
        ToolName::PrepareForUpload => report_builder(
            name,
            "Processes a confirmed visit report and prepares it for upload. Account and contact must be verified first.",
        )
        .build(),
    }
}

/// Tool definitions for a deployment
pub fn tool_definitions(mode: UploadMode) -> Vec<ToolDefinition> {
    ToolName::published(mode)
        .into_iter()
        .map(tool_definition)
        .collect()
}

static VALIDATORS: Lazy<HashMap<ToolName, JSONSchema>> = Lazy::new(|| {
    [
        ToolName::FindAccountByName,
        ToolName::ListContactsForAccount,
        ToolName::UploadVisitReport,
        ToolName::PrepareForUpload,
    ]
    .into_iter()
    .filter_map(|name| {
        let schema = tool_definition(name).parameters;
        match JSONSchema::compile(&schema) {
            Ok(compiled) => Some((name, compiled)),
            Err(e) => {
                tracing::error!(tool = %name, error = %e, "Tool schema failed to compile");
                None
            },
        }
    })
    .collect()
});

/// Check arguments against the tool's published schema
pub fn validate_arguments(name: ToolName, arguments: &Value) -> Result<(), ToolError> {
    if arguments.is_null() {
        return Err(ToolError::invalid_params("Arguments were not valid JSON"));
    }

    let validator = VALIDATORS
        .get(&name)
        .ok_or_else(|| ToolError::internal(format!("No schema for {}", name)))?;

    if let Err(errors) = validator.validate(arguments) {
        let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(ToolError::invalid_params(messages.join("; ")));
    }

    Ok(())
}

/// Validate then deserialize typed arguments
pub fn parse_arguments<T: DeserializeOwned>(name: ToolName, arguments: &Value) -> Result<T, ToolError> {
    validate_arguments(name, arguments)?;
    serde_json::from_value(arguments.clone())
        .map_err(|e| ToolError::invalid_params(format!("Invalid arguments for {}: {}", name, e)))
}

/// `find_account_by_name` arguments
#[derive(Debug, Clone, Deserialize)]
pub struct FindAccountArgs {
    pub account_name: String,
}

/// `list_contacts_for_account` arguments
#[derive(Debug, Clone, Deserialize)]
pub struct ListContactsArgs {
    pub account_name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
}

impl ListContactsArgs {
    /// Requested contact, if one was given and is not blank
    pub fn requested_contact(&self) -> Option<&str> {
        self.contact_name
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// `upload_visit_report` / `prepare_for_upload` arguments
#[derive(Debug, Clone, Deserialize)]
pub struct VisitReportArgs {
    pub account_name: String,
    pub primary_contact: String,
    pub date: String,
    pub location: String,
    pub division: String,
    pub subject: String,
    pub description: String,
    #[serde(default)]
    pub machines: Option<String>,
}

impl VisitReportArgs {
    /// Convert to a typed report, rejecting unparseable dates and enumerations
    pub fn to_report(&self) -> Result<VisitReport, ToolError> {
        let visit_date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|_| {
            ToolError::invalid_params(format!("date '{}' is not YYYY-MM-DD", self.date))
        })?;
        let location = self.location.parse().map_err(ToolError::invalid_params)?;
        let division = self.division.parse().map_err(ToolError::invalid_params)?;

        let machines = self
            .machines
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case("none"))
            .map(String::from);

        Ok(VisitReport {
            account: self.account_name.trim().to_string(),
            primary_contact: self.primary_contact.trim().to_string(),
            visit_date,
            location,
            division,
            subject: self.subject.trim().to_string(),
            description: self.description.trim().to_string(),
            machines,
        })
    }
}
