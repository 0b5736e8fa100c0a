use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

/// Creates a config pointing both platforms at an unroutable local port.
fn create_unreachable_config() -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"slack:\n  team_id: T012345\n  base_url: http://127.0.0.1:9\ngitlab:\n  group_path: acme\n  base_url: http://127.0.0.1:9\n",
    )
    .expect("Writing temp config failed");
    config
}

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("emoji-sync").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert().success().stdout(
        predicate::str::contains("sync")
            .and(predicate::str::contains("list"))
            .and(predicate::str::contains("empty"))
            .and(predicate::str::contains("check")),
    );
}

#[test]
fn empty_without_confirmation_is_refused() {
    let config = create_unreachable_config();
    let mut cmd = Command::cargo_bin("emoji-sync").expect("Binary exists");
    cmd.arg("empty")
        .arg("--config")
        .arg(config.path())
        .arg("--platform")
        .arg("gitlab")
        .env("SLACK_TOKEN", "xoxb-test")
        .env("GITLAB_TOKEN", "glpat-test");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn sync_without_tokens_fails_naming_the_variable() {
    let config = create_unreachable_config();
    let mut cmd = Command::cargo_bin("emoji-sync").expect("Binary exists");
    cmd.arg("sync")
        .arg("--config")
        .arg(config.path())
        .env_remove("SLACK_TOKEN")
        .env_remove("GITLAB_TOKEN");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("SLACK_TOKEN"));
}

#[test]
fn sync_with_unreachable_source_emits_single_error_event() {
    let config = create_unreachable_config();
    let mut cmd = Command::cargo_bin("emoji-sync").expect("Binary exists");
    cmd.arg("sync")
        .arg("--config")
        .arg(config.path())
        .env("SLACK_TOKEN", "xoxb-test")
        .env("GITLAB_TOKEN", "glpat-test");

    cmd.assert()
        .failure()
        .stdout(
            predicate::str::contains(r#""type":"error""#)
                .and(predicate::str::contains(r#""type":"progress""#).not())
                .and(predicate::str::contains(r#""type":"done""#).not()),
        );
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
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

    use emoji_sync::cli::{run, Cli, Commands};

    // A missing config file fails the command after the initial event.
    let cli = Cli {
        command: Commands::Sync {
            config: std::path::PathBuf::from("dummy.yaml"),
        },
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
