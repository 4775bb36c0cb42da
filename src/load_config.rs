/// `load_config` module: loads and adapts a static YAML config into the
/// internal [`TaskConfig`].
///
/// This module is the only place where untrusted YAML is parsed and mapped
/// to rich, strongly-typed internal structs.
///
/// # Responsibilities
/// - Parse user-supplied YAML configuration files into type-safe structs
/// - Map loosely-typed YAML keys (e.g., the string format tag) to enums
/// - Ensure robust error messages for CLI and tests: any failure in loading
///   must result in clear diagnostics.
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich
/// diagnostics, and are surfaced at the CLI boundary.
///
/// Connection secrets (CRM credentials, storage credentials) are NOT part of
/// the file; the concrete hooks read them from the environment.
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::{OutputFormat, TaskConfig};

#[derive(Debug, Deserialize)]
struct RawConfig {
    task: TaskSection,
}

#[derive(Debug, Deserialize)]
struct TaskSection {
    #[serde(default = "default_conn_id")]
    crm_conn_id: String,
    #[serde(default = "default_conn_id")]
    storage_conn_id: String,
    object: String,
    #[serde(default)]
    fields: Option<Vec<String>>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    relationship_object: Option<String>,
    #[serde(default = "default_format")]
    format: String,
    output: String,
    bucket: String,
    #[serde(default)]
    record_time_added: bool,
    #[serde(default)]
    coerce_to_timestamp: bool,
}

fn default_conn_id() -> String {
    "default".to_string()
}

fn default_format() -> String {
    "csv".to_string()
}

/// Loads a static YAML config file (no secrets) into a [`TaskConfig`].
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TaskConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let task = raw.task;
    Ok(TaskConfig {
        crm_conn_id: task.crm_conn_id,
        storage_conn_id: task.storage_conn_id,
        object: task.object,
        fields: task.fields,
        query: task.query,
        relationship_object: task.relationship_object,
        format: OutputFormat::from(task.format.as_str()),
        output: task.output,
        bucket: task.bucket,
        record_time_added: task.record_time_added,
        coerce_to_timestamp: task.coerce_to_timestamp,
    })
}
