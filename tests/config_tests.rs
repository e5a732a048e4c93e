//! Tests for file-based configuration loading.

use std::io::Write;

use rill::config::RillConfig;
use rill::error::RillError;
use rill::stream::StreamOptions;

#[test]
fn loads_config_from_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
base_url = "http://localhost:11434/v1"
max_tools = 16

[retry]
max_attempts = 5
initial_backoff_ms = 250
"#
    )
    .unwrap();

    let config = RillConfig::from_file(file.path()).unwrap();

    assert_eq!(config.base_url, "http://localhost:11434/v1");
    assert_eq!(config.max_tools, 16);
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.initial_backoff_ms, 250);
    assert_eq!(config.retry.max_backoff_ms, 30_000);
    assert_eq!(config.api_key, None);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RillConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, RillError::Io(_)));
}

#[test]
fn invalid_values_in_file_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[retry]\nmultiplier = 0.5\n").unwrap();

    let err = RillConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, RillError::Configuration(_)));
}

#[test]
fn malformed_toml_is_a_configuration_error() {
    let err = RillConfig::from_toml_str("base_url = ").unwrap_err();
    assert!(matches!(err, RillError::Configuration(_)));
}

#[test]
fn stream_options_follow_config() {
    let config = RillConfig::from_toml_str(
        r#"
text_tool_calls = true

[inline_tags]
start = "<reasoning>"
end = "</reasoning>"
"#,
    )
    .unwrap();

    let options = StreamOptions::from(&config);
    assert!(options.text_tool_calls);
    assert_eq!(options.inline_tags.start, "<reasoning>");
    assert_eq!(options.inline_tags.end, "</reasoning>");
}
