use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Fields;

/// Request body for a new sign-up.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubmission {
    pub name: String,
    pub email: String,
    pub interest: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
        }
    }
}

/// A sign-up exactly as it is written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub interest: String,
    pub timestamp: String,
    pub status: SubmissionStatus,
}

impl Submission {
    /// A missing or blank timestamp becomes `now`; anything else is kept verbatim.
    pub fn from_input(input: NewSubmission, now: DateTime<Utc>) -> Self {
        let timestamp = input
            .timestamp
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true));

        Self {
            name: input.name,
            email: input.email,
            interest: input.interest,
            timestamp,
            status: SubmissionStatus::Pending,
        }
    }

    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".into(), Value::from(self.name.as_str()));
        fields.insert("email".into(), Value::from(self.email.as_str()));
        fields.insert("interest".into(), Value::from(self.interest.as_str()));
        fields.insert("timestamp".into(), Value::from(self.timestamp.as_str()));
        fields.insert("status".into(), Value::from(self.status.as_str()));
        fields
    }
}
