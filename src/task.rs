//! High-level pipeline: orchestrates extract → serialize → upload for one run.
//!
//! This module provides the single invocable unit of the crate. It implements
//! a coordinated pipeline that:
//!   - Authenticates against the CRM hook and resolves the field list
//!   - Fetches records by object name or by raw custom query (optionally
//!     flattening a nested relationship collection)
//!   - Serializes the records to a scoped temporary file
//!   - Uploads the file to the configured bucket/key and returns a report.
//!
//! # Major Types
//! - [`ExtractTransferTask`]: holds the immutable [`TaskConfig`] for a run
//! - [`TaskReport`]: output report for downstream audit
//! - [`TaskError`]: per-stage error taxonomy
//!
//! # Error Handling
//! Fail-fast orchestration: each failed step returns immediately with the
//! failing stage attached. No retry, no checkpointing of partial progress;
//! the external scheduler owns retry policy. The temporary file is removed
//! on every exit path.

use std::fmt;

use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::config::{ExecutionContext, TaskConfig};
use crate::contract::{CrmHook, HookError, ObjectStore, QueryResult, Record};
use crate::records::{self, WriteError};

#[derive(Debug)]
pub enum TaskError {
    /// Invalid configuration, raised before any network I/O.
    Config(String),
    /// CRM hook failure (sign-in, field listing, fetch or query), surfaced
    /// unchanged with the failing stage attached.
    Crm {
        stage: &'static str,
        source: HookError,
    },
    /// Record serialization failure.
    Serialize(WriteError),
    /// Object-storage hook failure, surfaced unchanged.
    Upload(HookError),
    /// Temporary-file failure.
    Io(std::io::Error),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Config(msg) => write!(f, "configuration error: {msg}"),
            TaskError::Crm { stage, source } => write!(f, "CRM {stage} failed: {source}"),
            TaskError::Serialize(e) => write!(f, "serialization failed: {e}"),
            TaskError::Upload(e) => write!(f, "upload failed: {e}"),
            TaskError::Io(e) => write!(f, "temporary file error: {e}"),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::Config(_) => None,
            TaskError::Crm { source, .. } => {
                let source: &(dyn std::error::Error + 'static) = source.as_ref();
                Some(source)
            }
            TaskError::Serialize(e) => Some(e),
            TaskError::Upload(source) => {
                let source: &(dyn std::error::Error + 'static) = source.as_ref();
                Some(source)
            }
            TaskError::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for TaskError {
    fn from(e: std::io::Error) -> Self {
        TaskError::Io(e)
    }
}

impl From<WriteError> for TaskError {
    fn from(e: WriteError) -> Self {
        TaskError::Serialize(e)
    }
}

/// Output report for one successful execution.
#[derive(Debug)]
pub struct TaskReport {
    pub records_written: usize,
    pub bytes_uploaded: u64,
    pub bucket: String,
    pub key: String,
}

/// One-shot extract-and-transfer task.
///
/// Construction stores configuration only; all side effects are deferred to
/// [`ExtractTransferTask::run`].
pub struct ExtractTransferTask {
    config: TaskConfig,
}

impl ExtractTransferTask {
    pub fn new(config: TaskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Execute the task once: authenticate, fetch, serialize, upload.
    ///
    /// Strictly linear; any failing step aborts the run and propagates to
    /// the caller, which owns retry policy. The temporary hand-off file is
    /// removed on every exit path.
    pub async fn run<C, S>(
        &self,
        crm: &C,
        store: &S,
        ctx: &ExecutionContext,
    ) -> Result<TaskReport, TaskError>
    where
        C: CrmHook,
        S: ObjectStore,
    {
        let config = &self.config;
        info!(
            run_id = %ctx.run_id,
            scheduled_at = %ctx.scheduled_at,
            object = %config.object,
            "Prepping to gather data from the CRM"
        );

        // Configuration is validated before any hook call.
        if let Some(query) = &config.query {
            if query.trim().is_empty() {
                error!("Custom query configured but empty");
                return Err(TaskError::Config(
                    "custom query is empty; cannot query nothing".into(),
                ));
            }
        }

        // Scoped hand-off file between the fetch and upload stages. Dropping
        // it removes the file, success or failure.
        let tmp = NamedTempFile::new()?;

        crm.sign_in().await.map_err(|e| {
            error!(error = %e, "CRM sign-in failed");
            TaskError::Crm {
                stage: "sign_in",
                source: e,
            }
        })?;

        let fields = match &config.fields {
            Some(fields) if !fields.is_empty() => fields.clone(),
            _ => crm.list_fields(&config.object).await.map_err(|e| {
                error!(error = %e, object = %config.object, "Field listing failed");
                TaskError::Crm {
                    stage: "list_fields",
                    source: e,
                }
            })?,
        };
        if fields.is_empty() {
            return Err(TaskError::Config(format!(
                "object {} resolved to an empty field list",
                config.object
            )));
        }
        info!(
            field_count = fields.len(),
            object = %config.object,
            "Making request for resolved field list"
        );

        let result = match &config.query {
            Some(query) => self.run_custom_query(crm, query).await?,
            None => crm.fetch_object(&config.object, &fields).await.map_err(|e| {
                error!(error = %e, object = %config.object, "Object fetch failed");
                TaskError::Crm {
                    stage: "fetch_object",
                    source: e,
                }
            })?,
        };
        info!(
            records = result.records.len(),
            total_size = ?result.total_size,
            "Fetched records from the CRM"
        );

        info!(path = %tmp.path().display(), "Writing query results to temporary file");
        let written = records::write_records(
            &result.records,
            tmp.path(),
            config.format,
            config.coerce_to_timestamp,
            config.record_time_added,
        )?;
        let bytes_uploaded = tmp.path().metadata()?.len();

        store
            .upload_file(tmp.path(), &config.output, &config.bucket, true)
            .await
            .map_err(|e| {
                error!(error = %e, bucket = %config.bucket, key = %config.output, "Upload failed");
                TaskError::Upload(e)
            })?;
        info!(
            bucket = %config.bucket,
            key = %config.output,
            bytes = bytes_uploaded,
            "Upload complete"
        );

        store.close().await.map_err(TaskError::Upload)?;

        Ok(TaskReport {
            records_written: written,
            bytes_uploaded,
            bucket: config.bucket.clone(),
            key: config.output.clone(),
        })
    }

    /// Custom-query path: re-authenticate, run the raw query, and flatten
    /// the configured relationship collection if one is set.
    ///
    /// The re-login before the query is deliberate (doubles as a token
    /// refresh when the query follows an earlier sign-in in the same run).
    pub async fn run_custom_query<C>(
        &self,
        crm: &C,
        query: &str,
    ) -> Result<QueryResult, TaskError>
    where
        C: CrmHook,
    {
        if query.trim().is_empty() {
            return Err(TaskError::Config(
                "custom query is empty; cannot query nothing".into(),
            ));
        }

        crm.sign_in().await.map_err(|e| TaskError::Crm {
            stage: "sign_in",
            source: e,
        })?;

        let mut result = crm.run_query(query).await.map_err(|e| {
            error!(error = %e, "Custom query failed");
            TaskError::Crm {
                stage: "run_query",
                source: e,
            }
        })?;

        if let Some(relationship) = &self.config.relationship_object {
            result.records = flatten_relationship(result.records, relationship);
            result.total_size = Some(result.records.len() as u64);
            info!(
                relationship = %relationship,
                records = result.records.len(),
                "Flattened relationship collection"
            );
        }
        Ok(result)
    }
}

/// Replace each top-level record with the contents of its nested
/// relationship collection. Records lacking the relationship are dropped.
pub fn flatten_relationship(records: Vec<Record>, relationship: &str) -> Vec<Record> {
    let mut flattened = Vec::new();
    for record in records {
        match record
            .get(relationship)
            .and_then(|v| v.get("records"))
            .and_then(|v| v.as_array())
        {
            Some(nested) => {
                for value in nested {
                    if let serde_json::Value::Object(map) = value {
                        flattened.push(map.clone());
                    }
                }
            }
            None => {
                debug!(relationship, "Record lacks relationship collection, dropping");
            }
        }
    }
    flattened
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn flatten_concatenates_nested_collections_and_drops_bare_records() {
        let a = json!({"Id": "a", "Email": "a@example.com"});
        let b = json!({"Id": "b", "Email": "b@example.com"});
        let records = vec![
            record(json!({"Contacts": {"records": [a.clone(), b.clone()]}})),
            record(json!({"other": 1})),
        ];

        let flattened = flatten_relationship(records, "Contacts");
        assert_eq!(flattened, vec![record(a), record(b)]);
    }

    #[test]
    fn flatten_of_empty_input_is_empty() {
        assert!(flatten_relationship(Vec::new(), "Contacts").is_empty());
    }
}
