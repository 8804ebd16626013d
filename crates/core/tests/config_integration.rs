//! tracelink.toml 통합 설정 테스트
//!
//! - tracelink.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use tracelink_core::config::TracelinkConfig;
use tracelink_core::error::{ConfigError, TracelinkError};

// =============================================================================
// tracelink.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../tracelink.toml.example");
    let config = TracelinkConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.resolver.base_url, "http://localhost:5000");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../tracelink.toml.example");
    let config = TracelinkConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let content = include_str!("../../../tracelink.toml.example");
    let parsed = TracelinkConfig::parse(content).expect("should parse");
    let defaults = TracelinkConfig::default();

    assert_eq!(
        parsed.scanner.poll_interval_ms,
        defaults.scanner.poll_interval_ms
    );
    assert_eq!(parsed.scanner.camera_facing, defaults.scanner.camera_facing);
    assert_eq!(
        parsed.scanner.max_upload_bytes,
        defaults.scanner.max_upload_bytes
    );
    assert_eq!(
        parsed.scanner.event_channel_capacity,
        defaults.scanner.event_channel_capacity
    );
    assert_eq!(parsed.resolver.timeout_secs, defaults.resolver.timeout_secs);
    assert_eq!(parsed.resolver.auth_token, defaults.resolver.auth_token);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_scanner_only() {
    let toml = r#"
[scanner]
poll_interval_ms = 150
camera_facing = "user"
"#;
    let config = TracelinkConfig::parse(toml).expect("should parse");
    assert_eq!(config.scanner.poll_interval_ms, 150);
    assert_eq!(config.scanner.camera_facing, "user");
    // 나머지는 기본값
    assert_eq!(config.scanner.event_channel_capacity, 64);
    assert_eq!(config.general.log_level, "info");
    config.validate().expect("should validate");
}

#[test]
fn partial_config_resolver_only() {
    let toml = r#"
[resolver]
base_url = "https://trace.example.com"
auth_token = "token-123"
"#;
    let config = TracelinkConfig::parse(toml).expect("should parse");
    assert_eq!(config.resolver.base_url, "https://trace.example.com");
    assert_eq!(config.resolver.auth_token, "token-123");
    assert_eq!(config.resolver.timeout_secs, 15);
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[resolver]
base_url = "http://from-file:5000"
"#;

    let original = std::env::var("TRACELINK_RESOLVER_BASE_URL").ok();
    // SAFETY: serial 테스트로 실행되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("TRACELINK_RESOLVER_BASE_URL", "https://from-env");
    }

    let mut config = TracelinkConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.resolver.base_url.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("TRACELINK_RESOLVER_BASE_URL", val),
            None => std::env::remove_var("TRACELINK_RESOLVER_BASE_URL"),
        }
    }

    assert_eq!(result, "https://from-env");
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let original = std::env::var("TRACELINK_SCANNER_POLL_INTERVAL_MS").ok();
    // SAFETY: serial 테스트로 실행되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("TRACELINK_SCANNER_POLL_INTERVAL_MS", "400");
    }

    let mut config = TracelinkConfig::default();
    config.apply_env_overrides();
    let result = config.scanner.poll_interval_ms;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("TRACELINK_SCANNER_POLL_INTERVAL_MS", val),
            None => std::env::remove_var("TRACELINK_SCANNER_POLL_INTERVAL_MS"),
        }
    }

    assert_eq!(result, 400);
}

#[test]
#[serial_test::serial]
fn env_override_missing_var_keeps_toml_value() {
    let toml = r#"
[general]
log_format = "pretty"
"#;
    let original = std::env::var("TRACELINK_GENERAL_LOG_FORMAT").ok();
    // SAFETY: serial 테스트로 실행되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::remove_var("TRACELINK_GENERAL_LOG_FORMAT");
    }

    let mut config = TracelinkConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();

    // SAFETY: 테스트 정리
    unsafe {
        if let Some(val) = original {
            std::env::set_var("TRACELINK_GENERAL_LOG_FORMAT", val);
        }
    }

    assert_eq!(config.general.log_format, "pretty");
}

// =============================================================================
// 에러 케이스 테스트
// =============================================================================

#[test]
fn empty_string_parses_with_defaults() {
    let config = TracelinkConfig::parse("").expect("empty should parse");
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.scanner.poll_interval_ms, 250);
}

#[test]
fn comments_only_parses_with_defaults() {
    let config =
        TracelinkConfig::parse("# just a comment\n# another\n").expect("should parse");
    assert_eq!(config.resolver.timeout_secs, 15);
}

#[test]
fn malformed_toml_returns_parse_error() {
    let err = TracelinkConfig::parse("[scanner\npoll_interval_ms = ").unwrap_err();
    assert!(matches!(
        err,
        TracelinkError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn wrong_type_for_numeric_field() {
    let toml = r#"
[resolver]
timeout_secs = "fifteen"
"#;
    let err = TracelinkConfig::parse(toml).unwrap_err();
    assert!(matches!(
        err,
        TracelinkError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn unknown_section_is_ignored() {
    let toml = r#"
[general]
log_level = "debug"

[inventory]
enabled = true
"#;
    let config = TracelinkConfig::parse(toml).expect("unknown section should be ignored");
    assert_eq!(config.general.log_level, "debug");
}

#[tokio::test]
async fn from_file_nonexistent_returns_file_not_found() {
    let err = TracelinkConfig::from_file("/definitely/not/here/tracelink.toml")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TracelinkError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn from_file_rejects_invalid_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tracelink.toml");
    std::fs::write(&path, "[scanner]\npoll_interval_ms = 5\n").expect("write");

    let err = TracelinkConfig::from_file(&path).await.unwrap_err();
    assert!(matches!(
        err,
        TracelinkError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn load_example_config_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tracelink.toml");
    std::fs::write(&path, include_str!("../../../tracelink.toml.example")).expect("write");

    let config = TracelinkConfig::from_file(&path)
        .await
        .expect("example should load");
    assert_eq!(config.scanner.camera_facing, "environment");
}

#[test]
fn serialize_and_reparse_roundtrip() {
    let mut config = TracelinkConfig::default();
    config.scanner.poll_interval_ms = 300;
    config.resolver.base_url = "https://trace.example.com".to_owned();

    let serialized = toml::to_string(&config).expect("serialize");
    let reparsed = TracelinkConfig::parse(&serialized).expect("reparse");
    assert_eq!(reparsed.scanner.poll_interval_ms, 300);
    assert_eq!(reparsed.resolver.base_url, "https://trace.example.com");
}
