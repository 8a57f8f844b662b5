use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::credential::DocId;

/// Most credentials accepted by a single `batch_issue` call.
pub const MAX_BATCH_SIZE: usize = 1000;

/// One row of an inline batch issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub individual_email: String,
    pub credential_data: Value,
}

impl BatchEntry {
    pub fn new(individual_email: impl Into<String>, credential_data: Value) -> Self {
        Self {
            individual_email: individual_email.into(),
            credential_data,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Success,
    #[serde(alias = "failure", alias = "error")]
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct BatchRow {
    pub row: usize,
    pub status: RowStatus,
    pub doc_id: Option<DocId>,
    pub error: Option<String>,
    pub individual_email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BatchRow {
    /// The issued document ID, or the reason this row failed.
    pub fn outcome(&self) -> Result<&DocId, &str> {
        match (&self.status, &self.doc_id) {
            (RowStatus::Success, Some(doc_id)) => Ok(doc_id),
            _ => Err(self.error.as_deref().unwrap_or("unknown error")),
        }
    }
}

/// Aggregate result of `batch_issue` and `batch_upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct BatchResult {
    pub total_rows: usize,
    pub success_count: usize,
    pub failure_count: usize,
    #[serde(default)]
    pub results: Vec<BatchRow>,
    /// The uploading user, as an email or a user object.
    pub uploaded_by: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BatchResult {
    pub fn failures(&self) -> impl Iterator<Item = &BatchRow> {
        self.results.iter().filter(|row| row.outcome().is_err())
    }

    pub fn uploaded_by_email(&self) -> Option<&str> {
        match self.uploaded_by.as_ref()? {
            Value::String(email) => Some(email),
            Value::Object(user) => user.get("email")?.as_str(),
            _ => None,
        }
    }
}
