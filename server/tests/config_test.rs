//! Tests for layered configuration loading.

use relay_server::config::{generate_config_template, Cli, Config, ConnectionConfig};
use std::io::Write;

fn write_toml(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults_without_file() {
    let cli = Cli {
        config: "/nonexistent/relay.toml".into(),
        ..Cli::default()
    };
    let config = Config::load(&cli).unwrap();

    assert_eq!(config.port, 3000);
    assert_eq!(config.bind_address, "0.0.0.0");
    assert!(!config.json_logs);
    assert_eq!(config.connection, ConnectionConfig::default());
}

#[test]
fn test_toml_file_overrides_defaults() {
    let file = write_toml(
        r#"
port = 4100
json_logs = true

[connection]
send_timeout_ms = 250
"#,
    );
    let cli = Cli {
        config: file.path().to_path_buf(),
        ..Cli::default()
    };
    let config = Config::load(&cli).unwrap();

    assert_eq!(config.port, 4100);
    assert!(config.json_logs);
    assert_eq!(config.connection.send_timeout_ms, 250);
    // Unset keys in the section keep their defaults.
    assert_eq!(config.connection.ping_interval_secs, 30);
    assert_eq!(config.connection.pong_timeout_secs, 10);
}

#[test]
fn test_cli_overrides_file() {
    let file = write_toml("port = 4100\nbind_address = \"127.0.0.1\"\n");
    let cli = Cli {
        port: Some(5200),
        config: file.path().to_path_buf(),
        ..Cli::default()
    };
    let config = Config::load(&cli).unwrap();

    assert_eq!(config.port, 5200);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(config.listen_addr(), "127.0.0.1:5200");
}

#[test]
fn test_generated_template_parses_as_defaults() {
    let file = write_toml(&generate_config_template());
    let cli = Cli {
        config: file.path().to_path_buf(),
        ..Cli::default()
    };
    assert_eq!(Config::load(&cli).unwrap(), Config::default());
}
