use std::{env, fs, path::PathBuf};

use uuid::Uuid;

use remora::config::{BASE_URL_ENV, Config, LoggingRotation, PUSH_URL_ENV};

/// Fresh directory with the schema copied next to where the config will live.
fn config_dir() -> PathBuf {
    let dir = env::temp_dir().join(format!("remora-config-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("temp dir should be creatable");

    let schema_source =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("remora.schema.json");
    fs::copy(schema_source, dir.join("remora.schema.json")).expect("schema copy");
    dir
}

fn write_config(contents: &str) -> PathBuf {
    let path = config_dir().join("remora.json5");
    fs::write(&path, contents).expect("config write");
    path
}

#[test]
fn given_empty_config_when_loaded_then_every_section_falls_back_to_defaults() {
    let path = write_config("{}");
    let config = Config::load(&path).expect("empty config should load");

    assert_eq!(config.gateway.base_url, "http://127.0.0.1:8700");
    assert_eq!(config.gateway.request_timeout_ms, 8_000);
    assert!(config.push.enabled);
    assert_eq!(config.push.backoff_base_ms, 500);
    assert_eq!(config.poll.interval_ms, 10_000);
    assert_eq!(config.store.history_capacity, 1_000);
    assert_eq!(config.logging.rotation, LoggingRotation::Daily);
    assert!(!config.metrics.enabled);
}

#[test]
fn given_json5_with_comments_when_loaded_then_values_land_in_their_sections() {
    let path = write_config(
        r#"{
            // only the backend endpoints differ from stock
            gateway: {
                base_url: "http://backend:9000",
                paths: { trust: "/v2/trust" },
            },
            poll: { interval_ms: 2500 },
            push: { enabled: false },
        }"#,
    );
    let config = Config::load(&path).expect("config should load");

    assert_eq!(config.gateway.base_url, "http://backend:9000");
    assert_eq!(config.gateway.paths.trust.as_deref(), Some("/v2/trust"));
    assert_eq!(config.poll.interval_ms, 2_500);
    assert!(!config.push.enabled);
    // Untouched sections keep their defaults.
    assert_eq!(config.store.write_queue_capacity, 64);
}

#[test]
fn given_unknown_field_when_loaded_then_schema_validation_rejects_it() {
    let path = write_config(r#"{ gatway: { base_url: "http://typo:1" } }"#);
    let err = Config::load(&path).expect_err("typo must not pass validation");
    assert!(err.to_string().contains("config validation failed"));
}

#[test]
fn given_wrong_type_when_loaded_then_schema_validation_rejects_it() {
    let path = write_config(r#"{ poll: { interval_ms: "fast" } }"#);
    let err = Config::load(&path).expect_err("string interval must not pass");
    assert!(err.to_string().contains("config validation failed"));
}

#[test]
fn given_missing_file_when_loaded_then_the_error_names_the_path() {
    let path = config_dir().join("nope.json5");
    let err = Config::load(&path).expect_err("missing file must fail");
    assert!(err.to_string().contains("nope.json5"));
}

#[test]
fn given_env_overrides_when_applied_then_urls_win_but_blanks_are_ignored() {
    // Env mutation is process-global, so both cases run inside one test.
    let mut config = Config::default();
    unsafe {
        env::set_var(BASE_URL_ENV, "http://override:1234");
        env::set_var(PUSH_URL_ENV, "ws://override:1234/ws");
    }
    config.apply_env_overrides();

    assert_eq!(config.gateway.base_url, "http://override:1234");
    assert_eq!(config.push.url, "ws://override:1234/ws");

    let mut config = Config::default();
    let file_value = config.gateway.base_url.clone();
    unsafe {
        env::set_var(BASE_URL_ENV, "   ");
        env::remove_var(PUSH_URL_ENV);
    }
    config.apply_env_overrides();

    assert_eq!(config.gateway.base_url, file_value, "blank override ignored");
    assert_eq!(config.push.url, "ws://127.0.0.1:8700/ws");

    unsafe {
        env::remove_var(BASE_URL_ENV);
    }
}
