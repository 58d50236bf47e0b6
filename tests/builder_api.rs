#![allow(missing_docs)]

use std::time::Duration;

use partwise::{ConfigError, Limits, MultipartBuilder, MultipartConfig, MultipartError};

#[test]
fn builder_default_is_permissive() {
    let builder = MultipartBuilder::default();
    assert_eq!(builder.config(), &MultipartConfig::default());

    let config = MultipartBuilder::new()
        .build_config()
        .expect("default builder config should be valid");
    assert_eq!(config, MultipartConfig::default());
}

#[test]
fn fluent_chaining_sets_expected_configuration() {
    let config = MultipartBuilder::new()
        .buffer_size(64)
        .read_timeout(Duration::from_secs(3))
        .allow_empty(false)
        .max_header_size(512)
        .max_parts(8)
        .max_part_size(1 << 20)
        .build_config()
        .expect("builder config should validate");

    assert_eq!(
        config,
        MultipartConfig {
            buffer_size: 64,
            read_timeout: Some(Duration::from_secs(3)),
            allow_empty: false,
            limits: Limits {
                max_header_size: Some(512),
                max_parts: Some(8),
                max_part_size: Some(1 << 20),
            },
        }
    );
}

#[test]
fn limits_replaces_all_limits() {
    let limits = Limits {
        max_parts: Some(2),
        ..Limits::default()
    };

    let builder = MultipartBuilder::new().max_part_size(4).limits(limits.clone());
    assert_eq!(builder.config().limits, limits);
}

#[test]
fn build_surfaces_config_errors() {
    let result = MultipartBuilder::new().max_parts(0).build_config();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidLimitValue { limit: "max_parts" })
    ));

    let builder = MultipartBuilder::new().with_config(MultipartConfig {
        buffer_size: 0,
        ..MultipartConfig::default()
    });
    assert!(matches!(builder.validate(), Err(ConfigError::InvalidBufferSize)));
}

#[tokio::test]
async fn build_creates_content_over_reader() {
    let body = "--X\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n12345\r\n--X--\r\n";
    let mut content = MultipartBuilder::new()
        .buffer_size(4)
        .max_part_size(4)
        .build(body.as_bytes(), "multipart/form-data; boundary=X")
        .expect("content should build");

    let part = content
        .pop()
        .await
        .expect("headers should parse")
        .expect("part expected");
    let err = part.bytes().await.expect_err("body exceeds limit");
    assert!(matches!(
        err,
        MultipartError::PartSizeLimitExceeded { max_part_size: 4, .. }
    ));
}

#[test]
fn build_rejects_missing_boundary() {
    let result = MultipartBuilder::new().build(&b""[..], "multipart/form-data");
    assert!(matches!(
        result,
        Err(MultipartError::Config(ConfigError::MissingBoundary))
    ));
}
