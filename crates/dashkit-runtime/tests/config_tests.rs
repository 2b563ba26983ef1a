#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::sync::Arc;

use dashkit_model::model::ObjRef;
use dashkit_runtime::{ConfigError, DashboardContext, InMemoryBackend, RuntimeConfig};
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Should create temp file");
    file.write_all(contents.as_bytes())
        .expect("Should write config");
    file
}

#[test]
fn test_load_reads_toml_file() {
    // GIVEN a config file with a dashboard and custom settings
    let file = config_file(
        r#"
        workspace = "analytics"
        dashboard = "dashboard.sales"
        log_profile = "prod"

        [settings]
        max_attribute_filters = 5
        event_buffer = 16
        "#,
    );

    // WHEN it is loaded
    let config = RuntimeConfig::load(Some(file.path())).expect("Should load");

    // THEN file values win over defaults
    assert_eq!(config.dashboard_ref(), Some(ObjRef::id("dashboard.sales")));
    assert_eq!(config.settings.max_attribute_filters, 5);
    assert_eq!(config.settings.event_buffer, 16);
    assert!(config.settings.layout_undo);
    assert!(config.profile().is_ok());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = RuntimeConfig::load(Some(&path)).unwrap_err();

    assert!(matches!(err, ConfigError::Io { path: ref p, .. } if *p == path));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let file = config_file("workspace = [unclosed");

    let err = RuntimeConfig::load(Some(file.path())).unwrap_err();

    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_zero_event_buffer_is_rejected() {
    let err = RuntimeConfig::from_toml_str("[settings]\nevent_buffer = 0").unwrap_err();

    let ConfigError::InvalidValue { key, .. } = err else {
        panic!("Expected an invalid value error");
    };
    assert_eq!(key, "settings.event_buffer");
}

#[test]
fn test_empty_workspace_override_is_rejected() {
    let mut config = RuntimeConfig::default();

    let err = config
        .apply_env_overrides(|key| (key == "DASHKIT_WORKSPACE").then(|| "  ".to_string()))
        .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "workspace"));
}

#[test]
fn test_context_from_config() {
    let mut config = RuntimeConfig::from_toml_str(
        r#"
        workspace = "analytics"
        dashboard = "dashboard.ops"

        [settings]
        layout_undo = false
        "#,
    )
    .unwrap();
    config
        .apply_env_overrides(|key| (key == "DASHKIT_API_TOKEN").then(|| "t0ken".to_string()))
        .unwrap();

    let ctx = DashboardContext::from_config(Arc::new(InMemoryBackend::new()), config);

    assert_eq!(ctx.workspace, "analytics");
    assert_eq!(ctx.dashboard_ref, Some(ObjRef::id("dashboard.ops")));
    assert!(!ctx.settings.layout_undo);
    assert!(!format!("{:?}", ctx).contains("t0ken"));
}
