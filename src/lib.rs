#![doc = "crm-bucket: extract CRM records and transfer them to an object-storage bucket."]

//! This crate implements a single one-shot workflow task: pull records out
//! of a CRM system via its query API, serialize them to a temporary local
//! file, and upload that file to an object-storage bucket. It is meant to be
//! invoked by an external orchestration host (see [`registry`] for the
//! manifest the host queries), and ships a thin CLI wrapper for standalone
//! runs.
//!
//! # Usage
//! Build an [`task::ExtractTransferTask`] from a [`config::TaskConfig`] and
//! run it against concrete [`contract::CrmHook`]/[`contract::ObjectStore`]
//! implementations.

pub mod cli;
pub mod config;
pub mod contract;
pub mod load_config;
pub mod records;
pub mod registry;
pub mod salesforce;
pub mod storage;
pub mod task;
