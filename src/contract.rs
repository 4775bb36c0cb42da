//! # contract: hook interfaces for the extract-and-transfer task
//!
//! This module defines the two trait seams the task orchestrates across:
//! the CRM query hook ([`CrmHook`]) and the object-storage hook
//! ([`ObjectStore`]), plus the shared record/query types flowing between
//! them.
//!
//! ## Interface & Extensibility
//! - Implement [`CrmHook`] for a new CRM backend (sign-in, field discovery,
//!   object fetch, raw query).
//! - Implement [`ObjectStore`] for a new upload destination.
//! - All methods are async, returning results and using boxed error types.
//! - Error handling is uniform: all API/caller errors return boxed trait
//!   objects; the task wraps them with the failing stage.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests (exported behind the
//!   `test-export-mocks` feature).

use std::path::Path;

use async_trait::async_trait;
use mockall::automock;

/// Error type shared by all hook methods (boxed error, surfaced unchanged).
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// One CRM record: an ordered mapping from field name to value.
///
/// `serde_json`'s `preserve_order` feature keeps the CRM's field order, so
/// the serialized output header matches the order fields came back in.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The result of a CRM fetch or raw query.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Total record count as reported by the CRM, when it reports one.
    pub total_size: Option<u64>,
    /// Whether the CRM considers the result set complete.
    pub done: bool,
    /// The ordered record sequence. May nest one level deep under a
    /// relationship key (`rel_name -> { "records": [...] }`).
    pub records: Vec<Record>,
}

/// Trait for querying records out of a CRM backend.
///
/// *NOTE:* This file acts as the *interface* only. The concrete Salesforce
/// client lives in [`crate::salesforce`]; tests use the generated mock.
///
/// The trait is `Send` + `Sync` and intended for async/await usage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CrmHook: Send + Sync {
    /// Authenticate against the CRM endpoint. Repeated calls re-login.
    async fn sign_in(&self) -> Result<(), HookError>;

    /// List the full field set of the given object type.
    async fn list_fields(&self, object: &str) -> Result<Vec<String>, HookError>;

    /// Fetch all records of the given object type, restricted to `fields`.
    async fn fetch_object(
        &self,
        object: &str,
        fields: &[String],
    ) -> Result<QueryResult, HookError>;

    /// Execute a raw query string verbatim.
    async fn run_query(&self, query: &str) -> Result<QueryResult, HookError>;
}

/// Trait for transferring a local file into an object-storage bucket.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local_path` to `bucket` under `key`.
    ///
    /// With `overwrite` set, any existing object at the key is replaced
    /// unconditionally; without it, an existing object is an error.
    async fn upload_file(
        &self,
        local_path: &Path,
        key: &str,
        bucket: &str,
        overwrite: bool,
    ) -> Result<(), HookError>;

    /// Release the storage-endpoint connection.
    async fn close(&self) -> Result<(), HookError>;
}
