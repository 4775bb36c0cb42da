use std::fs::write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

#[test]
fn run_fails_cleanly_for_a_missing_config_file() {
    let mut cmd = Command::cargo_bin("crm-bucket").expect("Binary exists");
    cmd.arg("run").arg("--config").arg("/definitely/not/here.yaml");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn run_fails_cleanly_for_invalid_yaml() {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(config.path(), b"task: [:::").expect("Writing temp config failed");

    let mut cmd = Command::cargo_bin("crm-bucket").expect("Binary exists");
    cmd.arg("run").arg("--config").arg(config.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("parse"));
}

#[test]
fn help_lists_the_run_subcommand() {
    let mut cmd = Command::cargo_bin("crm-bucket").expect("Binary exists");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("run"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use crm_bucket::cli::{run, Cli, Commands};

    // A dummy config path: the run fails at load time, but the trace event
    // must already have been emitted.
    let cli = Cli {
        command: Commands::Run {
            config: std::path::PathBuf::from("dummy.yaml"),
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
