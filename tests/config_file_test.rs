// Integration test for configuration file support

use authd::config::Config;
use authd::error::AuthdError;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_full_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("authd.toml");

    let toml_content = r#"
        poll_interval_secs = 30
        renew_interval_secs = 1800
        runtime_dir = "/run/user/1000"
        owner_env = "USER"
        ticket_command = ["kinit", "-R", "-c", "FILE:/tmp/krb5cc_1000"]
        token_command = ["aklog", "-force"]
        log_file = "/tmp/authd.log"
    "#;

    fs::write(&config_path, toml_content).unwrap();

    let config = Config::from_file(&config_path).unwrap();
    assert_eq!(config.poll_interval(), Duration::from_secs(30));
    assert_eq!(config.renew_interval(), Duration::from_secs(1800));
    assert_eq!(config.runtime_dir, PathBuf::from("/run/user/1000"));
    assert_eq!(config.owner_env, "USER");
    assert_eq!(config.ticket_command.len(), 4);
    assert_eq!(config.token_command, vec!["aklog", "-force"]);
    assert_eq!(config.log_file, Some(PathBuf::from("/tmp/authd.log")));
}

#[test]
fn test_empty_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("authd.toml");
    fs::write(&config_path, "").unwrap();

    let config = Config::from_file(&config_path).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_without_path_uses_defaults() {
    assert_eq!(Config::load(None).unwrap(), Config::default());
}

#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = Config::from_file(&temp_dir.path().join("missing.toml"));
    assert!(matches!(result, Err(AuthdError::ConfigError(_))));
}

#[test]
fn test_malformed_toml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("authd.toml");
    fs::write(&config_path, "poll_interval_secs = \"soon\"\n").unwrap();

    let result = Config::from_file(&config_path);
    assert!(matches!(result, Err(AuthdError::InvalidConfig(_))));
}

#[test]
fn test_invalid_values_fail_validation() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("authd.toml");
    fs::write(&config_path, "ticket_command = []\n").unwrap();

    let result = Config::from_file(&config_path);
    assert!(matches!(result, Err(AuthdError::ConfigValidationError(_))));
}

#[test]
fn test_relative_runtime_dir_resolves_at_startup() {
    use authd::daemon::PidFile;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("authd.toml");
    fs::write(&config_path, "runtime_dir = \"run\"\n").unwrap();

    let config = Config::from_file(&config_path).unwrap();
    assert_eq!(config.runtime_dir, PathBuf::from("run"));

    let pid_file = PidFile::locate(&config.runtime_dir, "alice", "4242").unwrap();
    assert!(pid_file.path().is_absolute());
    assert!(pid_file.path().starts_with(std::env::current_dir().unwrap()));
}
