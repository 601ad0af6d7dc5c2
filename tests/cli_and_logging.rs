// tests/cli_and_logging.rs

use clap::Parser;
use dagschedule::cli::{CliArgs, LogLevel};
use dagschedule::logging::resolve_level;

#[test]
fn defaults_when_no_flags_given() {
    let args = CliArgs::try_parse_from(["dagschedule"]).unwrap();
    assert!(args.config.is_none());
    assert!(args.log_level.is_none());
    assert!(!args.dry_run);
}

#[test]
fn all_flags_parse() {
    let args = CliArgs::try_parse_from([
        "dagschedule",
        "--config",
        "custom.toml",
        "--log-level",
        "debug",
        "--dry-run",
    ])
    .unwrap();

    assert_eq!(args.config.as_deref(), Some("custom.toml"));
    assert_eq!(args.log_level, Some(LogLevel::Debug));
    assert!(args.dry_run);
}

#[test]
fn unknown_log_level_is_rejected() {
    assert!(CliArgs::try_parse_from(["dagschedule", "--log-level", "loud"]).is_err());
}

#[test]
fn cli_level_wins_over_environment() {
    assert_eq!(
        resolve_level(Some(LogLevel::Error), Some("trace")),
        tracing::Level::ERROR
    );
}

#[test]
fn environment_level_is_used_without_cli_flag() {
    assert_eq!(resolve_level(None, Some(" Warning ")), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("debug")), tracing::Level::DEBUG);
}

#[test]
fn info_is_the_fallback() {
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
    assert_eq!(resolve_level(None, Some("nonsense")), tracing::Level::INFO);
}

#[tokio::test]
async fn dry_run_succeeds_without_running_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Dagschedule.toml");
    std::fs::write(&path, "[executor]\nmax_concurrency = 2\n").unwrap();

    let args = CliArgs::try_parse_from([
        "dagschedule",
        "--config",
        path.to_str().unwrap(),
        "--dry-run",
    ])
    .unwrap();

    assert!(dagschedule::run(args).await.unwrap());
}

#[tokio::test]
async fn demo_run_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Dagschedule.toml");
    std::fs::write(&path, "").unwrap();

    let args =
        CliArgs::try_parse_from(["dagschedule", "--config", path.to_str().unwrap()]).unwrap();
    assert!(dagschedule::run(args).await.unwrap());
}

#[tokio::test]
async fn explicit_missing_config_is_an_error() {
    let args = CliArgs::try_parse_from(["dagschedule", "--config", "/definitely/not/here.toml"])
        .unwrap();
    assert!(dagschedule::run(args).await.is_err());
}
