#![allow(missing_docs)]

use partwise::{Limits, MultipartConfig, MultipartContent, MultipartError};

const CONTENT_TYPE: &str = "multipart/form-data; boundary=BOUND";

#[tokio::test]
async fn enforces_max_part_size() {
    let config = config_with_limits(Limits {
        max_part_size: Some(3),
        ..Limits::default()
    });
    let body = multipart_body(&[("upload", "hello")]);
    let mut content = MultipartContent::with_config(body.as_slice(), CONTENT_TYPE, config)
        .expect("multipart should initialize");

    let part = content
        .pop()
        .await
        .expect("headers should parse")
        .expect("item expected");
    let err = part.bytes().await.expect_err("body should fail size limit");
    assert!(matches!(
        err,
        MultipartError::PartSizeLimitExceeded {
            part,
            max_part_size: 3
        } if part == "upload"
    ));
}

#[tokio::test]
async fn part_size_limit_is_inclusive() {
    let config = config_with_limits(Limits {
        max_part_size: Some(5),
        ..Limits::default()
    });
    let body = multipart_body(&[("note", "hello")]);
    let mut content = MultipartContent::with_config(body.as_slice(), CONTENT_TYPE, config)
        .expect("multipart should initialize");

    let part = content
        .pop()
        .await
        .expect("headers should parse")
        .expect("item expected");
    assert_eq!(part.text().await.expect("body fits the limit"), "hello");
}

#[tokio::test]
async fn enforces_max_parts() {
    let config = config_with_limits(Limits {
        max_parts: Some(1),
        ..Limits::default()
    });
    let body = multipart_body(&[("a", "1"), ("b", "2")]);
    let mut content = MultipartContent::with_config(body.as_slice(), CONTENT_TYPE, config)
        .expect("multipart should initialize");

    let first = content
        .pop()
        .await
        .expect("first part is allowed")
        .expect("item expected");
    assert_eq!(first.text().await.expect("text"), "1");

    let err = content.pop().await.expect_err("second part exceeds limit");
    assert!(matches!(err, MultipartError::PartsLimitExceeded { max_parts: 1 }));
}

#[tokio::test]
async fn max_parts_does_not_reject_the_closing_boundary() {
    let config = config_with_limits(Limits {
        max_parts: Some(2),
        ..Limits::default()
    });
    let body = multipart_body(&[("a", "1"), ("b", "2")]);
    let mut content = MultipartContent::with_config(body.as_slice(), CONTENT_TYPE, config)
        .expect("multipart should initialize");

    let mut names = Vec::new();
    while let Some(part) = content.pop().await.expect("parts within limit") {
        names.push(part.name().map(str::to_owned));
    }
    assert_eq!(names, vec![Some("a".to_owned()), Some("b".to_owned())]);
}

#[tokio::test]
async fn enforces_max_header_size() {
    let config = MultipartConfig {
        buffer_size: 8,
        ..config_with_limits(Limits {
            max_header_size: Some(16),
            ..Limits::default()
        })
    };
    let body = multipart_body(&[("a-rather-long-field-name", "1")]);
    let mut content = MultipartContent::with_config(body.as_slice(), CONTENT_TYPE, config)
        .expect("multipart should initialize");

    let err = content.pop().await.expect_err("headers exceed limit");
    assert!(matches!(
        err,
        MultipartError::HeaderSizeLimitExceeded {
            max_header_size: 16
        }
    ));
}

fn config_with_limits(limits: Limits) -> MultipartConfig {
    MultipartConfig {
        limits,
        ..MultipartConfig::default()
    }
}

fn multipart_body(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, body) in parts {
        out.extend_from_slice(b"--BOUND\r\n");
        let disposition = format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n");
        out.extend_from_slice(disposition.as_bytes());
        out.extend_from_slice(body.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"--BOUND--\r\n");
    out
}
