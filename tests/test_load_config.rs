use std::fs::write;

use serial_test::serial;
use tempfile::NamedTempFile;

use crm_bucket::config::OutputFormat;
use crm_bucket::load_config::load_config;

/// A full config produces a TaskConfig with every field mapped through.
#[tokio::test]
#[serial]
async fn test_load_config_success_full_task_section() {
    let config_yaml = r#"
task:
  crm_conn_id: crm_prod
  storage_conn_id: store_prod
  object: Account
  fields:
    - Id
    - Name
  query: "SELECT Id, Name FROM Account"
  relationship_object: Contacts
  format: ndjson
  output: exports/accounts.ndjson
  bucket: crm-exports
  record_time_added: true
  coerce_to_timestamp: true
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let config = load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.crm_conn_id, "crm_prod");
    assert_eq!(config.storage_conn_id, "store_prod");
    assert_eq!(config.object, "Account");
    assert_eq!(
        config.fields.as_deref(),
        Some(["Id".to_string(), "Name".to_string()].as_slice())
    );
    assert_eq!(config.query.as_deref(), Some("SELECT Id, Name FROM Account"));
    assert_eq!(config.relationship_object.as_deref(), Some("Contacts"));
    assert_eq!(config.format, OutputFormat::Ndjson);
    assert_eq!(config.output, "exports/accounts.ndjson");
    assert_eq!(config.bucket, "crm-exports");
    assert!(config.record_time_added);
    assert!(config.coerce_to_timestamp);
}

/// Optional keys default: conn ids, flags, format, and the optional
/// fields/query/relationship are all absent here.
#[tokio::test]
#[serial]
async fn test_load_config_minimal_section_uses_defaults() {
    let config_yaml = r#"
task:
  object: Opportunity
  output: exports/opportunities.csv
  bucket: crm-exports
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let config = load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.crm_conn_id, "default");
    assert_eq!(config.storage_conn_id, "default");
    assert_eq!(config.fields, None);
    assert_eq!(config.query, None);
    assert_eq!(config.relationship_object, None);
    assert_eq!(config.format, OutputFormat::Csv);
    assert!(!config.record_time_added);
    assert!(!config.coerce_to_timestamp);
}

/// Unknown format tags fall back to CSV rather than failing the load.
#[tokio::test]
#[serial]
async fn test_load_config_unknown_format_falls_back_to_csv() {
    let config_yaml = r#"
task:
  object: Lead
  format: parquet
  output: exports/leads.csv
  bucket: crm-exports
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let config = load_config(config_file.path()).expect("Config should load");
    assert_eq!(config.format, OutputFormat::Csv);
}

/// Missing required keys cause a load failure.
#[tokio::test]
#[serial]
async fn test_load_config_errors_on_missing_required_fields() {
    let config_yaml = r#"
task:
  output: exports/out.csv
  bucket: crm-exports
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let err = load_config(config_file.path()).unwrap_err();
    assert!(
        err.to_string().contains("parse"),
        "expected parse failure, got: {err}"
    );
}

/// Invalid YAML errors and reports as such.
#[tokio::test]
#[serial]
async fn test_load_config_errors_for_invalid_file() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), b"not-yaml: [:::").unwrap();

    let err = load_config(config_file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

/// A missing file errors with the path in the message.
#[tokio::test]
#[serial]
async fn test_load_config_errors_for_missing_file() {
    let err = load_config("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
