#![allow(missing_docs)]

use std::time::Duration;

use partwise::{ConfigError, Limits, MultipartConfig, MultipartContent, MultipartError};

#[test]
fn default_config_is_valid() {
    let config = MultipartConfig::default();

    assert_eq!(config.buffer_size, 1024);
    assert_eq!(config.read_timeout, None);
    assert!(config.allow_empty);
    assert_eq!(config.limits, Limits::default());
    assert!(config.validate().is_ok());
}

#[test]
fn rejects_zero_buffer_size() {
    let config = MultipartConfig {
        buffer_size: 0,
        ..MultipartConfig::default()
    };

    let result = config.validate();
    assert!(matches!(result, Err(ConfigError::InvalidBufferSize)));
}

#[test]
fn rejects_invalid_numeric_limit_values() {
    for limits in [
        Limits {
            max_header_size: Some(0),
            ..Limits::default()
        },
        Limits {
            max_parts: Some(0),
            ..Limits::default()
        },
        Limits {
            max_part_size: Some(0),
            ..Limits::default()
        },
    ] {
        let config = MultipartConfig {
            limits,
            ..MultipartConfig::default()
        };

        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::InvalidLimitValue { .. })));
    }
}

#[test]
fn content_construction_validates_config() {
    let config = MultipartConfig {
        buffer_size: 0,
        ..MultipartConfig::default()
    };

    let result = MultipartContent::with_config(
        &b""[..],
        "multipart/form-data; boundary=B",
        config,
    );
    assert!(matches!(
        result,
        Err(MultipartError::Config(ConfigError::InvalidBufferSize))
    ));
}

#[tokio::test]
async fn read_timeout_bounds_stalled_sources() {
    let (client, _server) = tokio::io::duplex(64);
    let config = MultipartConfig {
        read_timeout: Some(Duration::from_millis(20)),
        ..MultipartConfig::default()
    };
    let mut content = MultipartContent::with_config(client, "multipart/form-data; boundary=B", config)
        .expect("multipart should initialize");

    let err = content.pop().await.expect_err("stalled source must time out");
    assert!(matches!(err, MultipartError::Io(ref err) if err.kind() == std::io::ErrorKind::TimedOut));
}

#[cfg(feature = "serde")]
#[test]
fn config_round_trips_through_serde() {
    let config = MultipartConfig {
        buffer_size: 4096,
        read_timeout: Some(Duration::from_secs(5)),
        allow_empty: false,
        limits: Limits {
            max_parts: Some(10),
            ..Limits::default()
        },
    };

    let value = serde_json::to_value(&config).expect("config should serialize");
    let back: MultipartConfig = serde_json::from_value(value).expect("config should deserialize");
    assert_eq!(back, config);
}
