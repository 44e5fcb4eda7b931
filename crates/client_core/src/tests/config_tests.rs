use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_point_at_hosted_platform() {
    let settings = load_settings_from(None, no_env);
    assert_eq!(settings.endpoint, "https://cloud.appwrite.io/v1");
    assert_eq!(settings.session_file, PathBuf::from("./data/session.json"));
}

#[test]
fn file_values_then_env_overrides_apply_in_order() {
    let file = r#"
endpoint = "http://localhost:8080/v1/"
project_id = "local-project"
storage_id = "local-bucket"
unknown_key = "ignored"
"#;
    let settings = load_settings_from(Some(file), |key| match key {
        "MEDIASHARE_PROJECT_ID" => Some("env-project".into()),
        "APP__STORAGE_ID" => Some("app-bucket".into()),
        _ => None,
    });

    assert_eq!(settings.endpoint, "http://localhost:8080/v1");
    assert_eq!(settings.project_id, "env-project");
    assert_eq!(settings.storage_id, "app-bucket");
    assert_eq!(settings.database_id, Settings::default().database_id);
}

#[test]
fn malformed_file_falls_back_to_defaults() {
    let settings = load_settings_from(Some("endpoint = [1, 2"), no_env);
    assert_eq!(settings.endpoint, Settings::default().endpoint);
}

#[test]
fn endpoint_validation_rejects_non_http_schemes() {
    assert_eq!(
        validate_endpoint(" https://cloud.example/v1/ ").expect("valid"),
        "https://cloud.example/v1"
    );
    assert!(validate_endpoint("ftp://cloud.example/v1").is_err());
    assert!(validate_endpoint("not a url").is_err());
}

#[test]
fn prepares_parent_dir_for_session_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("mediashare_session_test_{suffix}"));
    let settings = Settings {
        session_file: temp_root.join("nested").join("session.json"),
        ..Settings::default()
    };

    let path = prepare_session_file(&settings).expect("prepare");
    assert_eq!(path, settings.session_file);
    assert!(temp_root.join("nested").exists());

    fs::remove_dir_all(temp_root).expect("cleanup");
}
