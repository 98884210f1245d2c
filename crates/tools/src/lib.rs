//! Visit report tools
//!
//! Tool schemas published to the model, typed argument parsing with
//! JSON Schema validation, and the CRM integration the tools call into.

pub mod arguments;
pub mod integrations;
pub mod names;
pub mod schema;

pub use arguments::{
    parse_arguments, tool_definition, tool_definitions, validate_arguments, FindAccountArgs,
    ListContactsArgs, VisitReportArgs,
};
pub use integrations::{
    AccountLookup, AccountMatch, Contact, ContactList, CreatedRecord, CrmIntegration,
    IntegrationError, StubCrmIntegration, UploadRequest,
};
pub use names::ToolName;
pub use schema::{ErrorCode, ToolBuilder, ToolError};

/// Default timeout for a CRM call made on behalf of a tool
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
