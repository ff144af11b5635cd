use std::io::Write;
use std::time::Duration;

use agent_runner::cli::{RunnerConfig, build_coordinator};
use agent_runner::engine::types::LockScope;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(yaml.as_bytes()).unwrap();
    f
}

#[test]
fn load_valid_config_all_fields() {
    let yaml = r#"
host: "127.0.0.1"
port: 8080
max_body: 2097152
lock_timeout_s: 2.5
lock_scope: user
api_key: "a-secret-api-key"
run_times:
  document-extractor: 1.5
  policy-checker: 0.25
"#;

    let f = write_config(yaml);
    let cfg = RunnerConfig::load(Some(f.path())).unwrap();

    assert_eq!(cfg.host.as_deref(), Some("127.0.0.1"));
    assert_eq!(cfg.port, Some(8080));
    assert_eq!(cfg.max_body, Some(2097152));
    assert_eq!(cfg.lock_timeout_s, Some(2.5));
    assert_eq!(cfg.lock_scope, Some(LockScope::User));
    assert_eq!(cfg.api_key.as_deref(), Some("a-secret-api-key"));

    let run_times = cfg.run_times.unwrap();
    assert_eq!(run_times.len(), 2);
    assert_eq!(run_times["document-extractor"], 1.5);
    assert_eq!(run_times["policy-checker"], 0.25);
}

#[test]
fn load_partial_config() {
    let f = write_config("port: 9090\n");
    let cfg = RunnerConfig::load(Some(f.path())).unwrap();

    assert_eq!(cfg.port, Some(9090));
    assert!(cfg.host.is_none());
    assert!(cfg.max_body.is_none());
    assert!(cfg.lock_timeout_s.is_none());
    assert!(cfg.lock_scope.is_none());
    assert!(cfg.api_key.is_none());
    assert!(cfg.run_times.is_none());
}

#[test]
fn lock_scope_accepts_kebab_case() {
    let f = write_config("lock_scope: user-agent\n");
    let cfg = RunnerConfig::load(Some(f.path())).unwrap();
    assert_eq!(cfg.lock_scope, Some(LockScope::UserAgent));
}

#[test]
fn missing_explicit_path_returns_error() {
    let result = RunnerConfig::load(Some(std::path::Path::new(
        "/nonexistent/agent-runner.yaml",
    )));
    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Config file not found")
    );
}

#[test]
fn default_config_is_empty() {
    let cfg = RunnerConfig::default();
    assert!(cfg.host.is_none());
    assert!(cfg.port.is_none());
    assert!(cfg.max_body.is_none());
    assert!(cfg.lock_timeout_s.is_none());
    assert!(cfg.lock_scope.is_none());
    assert!(cfg.api_key.is_none());
    assert!(cfg.run_times.is_none());
}

#[test]
fn invalid_yaml_returns_error() {
    let f = write_config("port: [this is not valid yaml for a u16");

    let result = RunnerConfig::load(Some(f.path()));
    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file")
    );
}

#[test]
fn non_positive_lock_timeout_is_rejected() {
    let f = write_config("lock_timeout_s: -3\n");

    let result = RunnerConfig::load(Some(f.path()));
    assert!(result.unwrap_err().to_string().contains("Invalid lock_timeout_s"));
}

#[test]
fn infinite_lock_timeout_is_rejected() {
    let f = write_config("lock_timeout_s: .inf\n");

    let err = RunnerConfig::load(Some(f.path())).unwrap_err();
    assert!(err.to_string().contains("Invalid lock_timeout_s"));
    assert!(format!("{:#}", err).contains("positive number of seconds"));
}

#[test]
fn unknown_keys_are_ignored() {
    let yaml = r#"
port: 4000
unknown_setting: true
another_random_key: "hello"
"#;

    let f = write_config(yaml);
    let cfg = RunnerConfig::load(Some(f.path())).unwrap();
    assert_eq!(cfg.port, Some(4000));
}

// --- Coordinator assembly ---

#[test]
fn cli_values_override_config() {
    let cfg = RunnerConfig {
        lock_timeout_s: Some(4.0),
        lock_scope: Some(LockScope::User),
        ..Default::default()
    };

    let from_config = build_coordinator(&cfg, None, None).unwrap();
    assert_eq!(from_config.lock_scope(), LockScope::User);

    let overridden = build_coordinator(&cfg, Some(1.0), Some(LockScope::UserAgent)).unwrap();
    assert_eq!(overridden.lock_scope(), LockScope::UserAgent);
}

#[test]
fn defaults_apply_without_config() {
    let coordinator = build_coordinator(&RunnerConfig::default(), None, None).unwrap();
    assert_eq!(coordinator.lock_scope(), LockScope::UserAgent);
    assert_eq!(coordinator.lock_timeout(), Duration::from_secs(10));
    assert_eq!(coordinator.registry().list().len(), 2);
}

#[test]
fn non_positive_cli_timeout_is_rejected() {
    assert!(build_coordinator(&RunnerConfig::default(), Some(0.0), None).is_err());
}
