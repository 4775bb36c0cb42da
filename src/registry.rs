//! Host registration: the descriptor the orchestration host queries at load
//! time to discover invocable units.
//!
//! Rendered as an explicit manifest-building call rather than a module-level
//! mutable list. All extension-point lists are present but empty except the
//! single task.

use serde::Serialize;
use serde_json::{json, Value};

pub const PLUGIN_NAME: &str = "crm_bucket";
pub const EXTRACT_TRANSFER_TASK: &str = "extract_transfer";

/// Describes one invocable unit: name, human description, and a JSON
/// parameter schema mirroring [`crate::config::TaskConfig`].
#[derive(Debug, Clone, Serialize)]
pub struct TaskDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Value,
}

/// The full plugin declaration handed to the host.
#[derive(Debug, Clone, Serialize)]
pub struct PluginManifest {
    pub name: &'static str,
    pub tasks: Vec<TaskDescriptor>,
    pub hooks: Vec<&'static str>,
    pub macros: Vec<&'static str>,
    pub admin_views: Vec<&'static str>,
    pub menu_links: Vec<&'static str>,
}

/// Build the manifest the host queries at load time.
pub fn manifest() -> PluginManifest {
    PluginManifest {
        name: PLUGIN_NAME,
        tasks: vec![TaskDescriptor {
            name: EXTRACT_TRANSFER_TASK,
            description:
                "Extract CRM records via the query API and transfer them to an object-storage bucket",
            params: json!({
                "crm_conn_id": { "type": "string", "required": true },
                "storage_conn_id": { "type": "string", "required": true },
                "object": { "type": "string", "required": true },
                "fields": { "type": "array", "items": "string", "required": false },
                "query": { "type": "string", "required": false },
                "relationship_object": { "type": "string", "required": false },
                "format": { "type": "string", "default": "csv" },
                "output": { "type": "string", "required": true },
                "bucket": { "type": "string", "required": true },
                "record_time_added": { "type": "boolean", "default": false },
                "coerce_to_timestamp": { "type": "boolean", "default": false }
            }),
        }],
        hooks: Vec::new(),
        macros: Vec::new(),
        admin_views: Vec::new(),
        menu_links: Vec::new(),
    }
}
