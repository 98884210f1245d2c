//! Session instructions
//!
//! Built once per connection from today's date, the visit report schema and
//! the terminal tool the deployment exposes.

use chrono::NaiveDate;

use visit_agent_core::{visit_report_schema, Division, Location, UploadMode};

/// Builder for the realtime session instructions
#[derive(Debug, Clone)]
pub struct InstructionsBuilder {
    today: NaiveDate,
    upload_mode: UploadMode,
}

impl InstructionsBuilder {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            upload_mode: UploadMode::default(),
        }
    }

    /// Use the local date
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    pub fn with_upload_mode(mut self, mode: UploadMode) -> Self {
        self.upload_mode = mode;
        self
    }

    fn terminal_step(&self) -> &'static str {
        match self.upload_mode {
            UploadMode::Upload => {
                "- Once the user confirms the summary, call `upload_visit_report` and tell the user \
                 whether the report was stored in the CRM."
            },
            UploadMode::Prepare => {
                "- Once the user confirms the summary, call `prepare_for_upload` and tell the user \
                 the visit report is ready for upload to the CRM."
            },
        }
    }

    pub fn build(&self) -> String {
        let schema = visit_report_schema().to_string();
        let locations: Vec<&str> = Location::ALL.iter().map(|l| l.as_str()).collect();
        let divisions: Vec<&str> = Division::ALL.iter().map(|d| d.as_str()).collect();

        format!(
            r#"Today's date is {today}.

You are a voice agent for creating customer visit reports. Listen to what the user says and collect the information for one visit report. Ask for all missing information in one go, not field by field.

## Fields
- Account (company the meeting was with)
- Primary contact
- Date
- Location (one of: {locations})
- Division (one of: {divisions})
- Subject
- Description
- Optional: machines that were discussed

The finished report must match this schema: {schema}

## Process
- When the user names an account, call `find_account_by_name` and ask for clarification if it is not found or ambiguous.
- When the user names a contact, call `list_contacts_for_account` with the account and the contact name, and ask for clarification if the contact is not listed.
- When you have an account but no contact, call `list_contacts_for_account` without a contact name and let the user choose.
- If the user changes the account or contact later, verify it again with the tools.
- Resolve "today", "yesterday" and "tomorrow" against today's date. The date is always written as YYYY-MM-DD.
- The description is a brief summary in your own words.
- Once every required field is known, reply only with a structured summary in schema field order and ask whether the user wants changes.
{terminal}
- Then ask whether the user wants to create another report.

## Rules
- Always use the tools for lookups and only trust tool data and what the user said.
- Do not add fields that are not in the schema.
- Speak responses aloud and stay conversational."#,
            today = self.today.format("%Y-%m-%d"),
            locations = locations.join(", "),
            divisions = divisions.join(", "),
            schema = schema,
            terminal = self.terminal_step(),
        )
    }
}
