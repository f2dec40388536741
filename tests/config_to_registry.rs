//! End-to-end configuration handling: YAML file in, registered processes
//! out, with load failures surfacing before anything starts.

use std::error::Error;
use std::io::Write;

use composer::cli::{CliArgs, Command};
use composer::config::load_and_validate;
use composer::{build_registry, run};
use composer_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn yaml_services_become_ready_processes() -> TestResult {
    init_tracing();

    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"
settings:
  logger:
    destination: /dev/null

services:
  db:
    command: "sleep 30"
  web:
    command: "sh -c 'echo up'"
    environment:
      PORT: "3000"
    hooks:
      wait: [db]
      kill: [worker]
  worker:
    command: "sleep 30"
    ignore_error: true
"#
    )?;

    let cfg = load_and_validate(file.path())?;
    let registry = build_registry(cfg)?;

    let snapshot = registry.snapshot();
    assert_eq!(
        snapshot.ready,
        vec!["db".to_string(), "web".to_string(), "worker".to_string()]
    );
    assert_eq!(snapshot.license_to_kill, vec!["worker".to_string()]);
    assert!(registry.is_allowed_to_be_killed("worker"));
    assert!(!registry.is_allowed_to_be_killed("db"));

    Ok(())
}

#[tokio::test]
async fn unknown_hook_reference_fails_at_load_time() -> TestResult {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"
services:
  web:
    command: "true"
    hooks:
      wait: [ghost]
"#
    )?;

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(err.to_string().contains("ghost"));

    Ok(())
}

#[tokio::test]
async fn start_with_missing_config_is_an_error() {
    init_tracing();

    let args = CliArgs {
        verbose: false,
        command: Command::Start {
            config: "/no/such/composer.yml".into(),
        },
    };
    assert!(run(args).await.is_err());
}

#[tokio::test]
async fn version_command_succeeds() {
    let args = CliArgs {
        verbose: false,
        command: Command::Version,
    };
    run(args).await.unwrap();
}
