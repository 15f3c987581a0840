pub mod validate;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::{NewSubmission, Submission};
use crate::store::{DocumentStore, Fields};

pub const COLLECTION: &str = "submissions";

#[derive(Debug, Clone, Serialize)]
pub struct CreatedSubmission {
    pub id: String,
    pub data: Submission,
}

/// Create and list sign-ups. Holds the process-wide store handle; each call
/// maps to exactly one store call.
#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn DocumentStore>,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: NewSubmission) -> Result<CreatedSubmission, AppError> {
        if let Err(rejection) = validate::validate(&input) {
            tracing::warn!("create_submission rejected: {rejection}");
            return Err(AppError::Validation(rejection.detail));
        }

        let submission = Submission::from_input(input, Utc::now());
        let id = self
            .store
            .write(COLLECTION, submission.to_fields())
            .await
            .map_err(|e| {
                tracing::error!("create_submission failed on {}: {e}", self.store.name());
                AppError::from(e)
            })?;

        tracing::info!(
            "create_submission stored {id} (interest: {})",
            submission.interest
        );

        Ok(CreatedSubmission {
            id,
            data: submission,
        })
    }

    /// Every stored record, fields verbatim plus the document `id`.
    pub async fn list(&self) -> Result<Vec<Fields>, AppError> {
        let documents = self.store.list(COLLECTION).await.map_err(|e| {
            tracing::error!("list_submissions failed on {}: {e}", self.store.name());
            AppError::from(e)
        })?;

        tracing::info!("list_submissions returned {} records", documents.len());

        Ok(documents
            .into_iter()
            .map(|doc| {
                let mut record = doc.fields;
                record.insert("id".to_string(), Value::String(doc.id));
                record
            })
            .collect())
    }
}
