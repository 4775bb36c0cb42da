use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Output serialization format for the transferred file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    Ndjson,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "csv" => OutputFormat::Csv,
            "json" => OutputFormat::Json,
            "ndjson" | "jsonl" => OutputFormat::Ndjson,
            other => {
                warn!(format = other, "Unknown output format, defaulting to csv");
                OutputFormat::Csv
            }
        }
    }
}

/// Full configuration for one extract-and-transfer execution.
///
/// Immutable once the task begins executing: the task holds it by value and
/// never writes back to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Identifier of the CRM connection (resolved by the host environment).
    pub crm_conn_id: String,
    /// Identifier of the storage connection (resolved by the host environment).
    pub storage_conn_id: String,
    /// Name of the CRM object to fetch records from.
    pub object: String,
    /// Explicit field list. `None` resolves to the object's full field set.
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    /// Raw query overriding default object-based fetching.
    #[serde(default)]
    pub query: Option<String>,
    /// Relationship-object name whose nested records replace the top-level
    /// result set in custom-query mode.
    #[serde(default)]
    pub relationship_object: Option<String>,
    /// Serialization format for the output file.
    pub format: OutputFormat,
    /// Object key the file is uploaded under.
    pub output: String,
    /// Destination bucket name.
    pub bucket: String,
    /// Append a fetch-time numeric timestamp field to every record.
    #[serde(default)]
    pub record_time_added: bool,
    /// Coerce date/datetime fields to numeric UTC timestamps.
    #[serde(default)]
    pub coerce_to_timestamp: bool,
}

impl TaskConfig {
    pub fn trace_loaded(&self) {
        info!(
            object = %self.object,
            bucket = %self.bucket,
            output = %self.output,
            format = ?self.format,
            custom_query = self.query.is_some(),
            "Loaded TaskConfig"
        );
        debug!(?self, "TaskConfig loaded (full debug)");
    }
}

/// Scheduler-supplied identity for one run. Used for structured logging;
/// the task takes no decisions from it.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub run_id: String,
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            scheduled_at: chrono::Utc::now(),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
