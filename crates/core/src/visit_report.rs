//! Visit report data contract
//!
//! Field names follow the CRM object. Location and division are closed
//! enumerations; everything else is free text apart from the ISO date.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Where the visit took place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Remote,
    Client,
    #[serde(rename = "At igus")]
    AtIgus,
    Other,
}

impl Location {
    pub const ALL: [Location; 4] = [
        Location::Remote,
        Location::Client,
        Location::AtIgus,
        Location::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Remote => "Remote",
            Location::Client => "Client",
            Location::AtIgus => "At igus",
            Location::Other => "Other",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(Location::Remote),
            "client" => Ok(Location::Client),
            "at igus" | "igus" => Ok(Location::AtIgus),
            "other" => Ok(Location::Other),
            other => Err(format!(
                "unknown location '{}', expected one of Remote, Client, At igus, Other",
                other
            )),
        }
    }
}

/// Product division the visit relates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Division {
    #[serde(rename = "e-chain")]
    EChain,
    #[serde(rename = "bearings")]
    Bearings,
    #[serde(rename = "e-chain&bearings")]
    EChainAndBearings,
}

impl Division {
    pub const ALL: [Division; 3] = [
        Division::EChain,
        Division::Bearings,
        Division::EChainAndBearings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Division::EChain => "e-chain",
            Division::Bearings => "bearings",
            Division::EChainAndBearings => "e-chain&bearings",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Division {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match normalized.as_str() {
            "e-chain" | "echain" => Ok(Division::EChain),
            "bearings" | "bearing" => Ok(Division::Bearings),
            "e-chain&bearings" | "e-chainandbearings" | "echain&bearings" | "both" => {
                Ok(Division::EChainAndBearings)
            },
            _ => Err(format!(
                "unknown division '{}', expected one of e-chain, bearings, e-chain&bearings",
                s.trim()
            )),
        }
    }
}

/// Which terminal tool the deployment exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// `upload_visit_report` writes the record to the CRM
    #[default]
    Upload,
    /// `prepare_for_upload` only returns the CRM field mapping
    Prepare,
}

/// A finished visit report, keyed by CRM field names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitReport {
    #[serde(rename = "Account__c")]
    pub account: String,
    #[serde(rename = "Primary_Contact__c")]
    pub primary_contact: String,
    #[serde(rename = "Visit_Date__c")]
    pub visit_date: NaiveDate,
    #[serde(rename = "Visit_Location__c")]
    pub location: Location,
    #[serde(rename = "Related_Product_Division__c")]
    pub division: Division,
    #[serde(rename = "Name")]
    pub subject: String,
    #[serde(rename = "Description__c")]
    pub description: String,
    #[serde(rename = "Machines__c", default, skip_serializing_if = "Option::is_none")]
    pub machines: Option<String>,
}

static VISIT_REPORT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    let locations: Vec<&str> = Location::ALL.iter().map(|l| l.as_str()).collect();
    let divisions: Vec<&str> = Division::ALL.iter().map(|d| d.as_str()).collect();
    json!({
        "title": "VisitReport",
        "type": "object",
        "properties": {
            "Account__c": {"type": "string", "description": "Account the visit was made to"},
            "Primary_Contact__c": {"type": "string", "description": "Primary contact person met"},
            "Visit_Date__c": {"type": "string", "format": "date", "description": "Visit date (YYYY-MM-DD)"},
            "Visit_Location__c": {"type": "string", "enum": locations},
            "Related_Product_Division__c": {"type": "string", "enum": divisions},
            "Name": {"type": "string", "description": "Subject of the visit"},
            "Description__c": {"type": "string", "description": "Summary of what was discussed"},
            "Machines__c": {"type": ["string", "null"], "description": "Machines discussed, if any"}
        },
        "required": [
            "Account__c",
            "Primary_Contact__c",
            "Visit_Date__c",
            "Visit_Location__c",
            "Related_Product_Division__c",
            "Name",
            "Description__c"
        ]
    })
});

/// JSON schema of [`VisitReport`], embedded in the session instructions
pub fn visit_report_schema() -> &'static Value {
    &VISIT_REPORT_SCHEMA
}
