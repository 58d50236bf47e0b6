#![allow(missing_docs)]

use partwise::{MultipartContent, MultipartError};

const CONTENT_TYPE: &str = "multipart/form-data; boundary=BOUND";

#[tokio::test]
async fn exposes_typed_content_headers() {
    let body = concat!(
        "--BOUND\r\n",
        "Content-Disposition: attachment; name=\"doc\"; filename*=UTF-8''r%C3%A9sum%C3%A9.txt\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "Content-Encoding: gzip\r\n",
        "Content-Length: 5\r\n",
        "Content-Language: en-US, fr\r\n",
        "X-Upload-Id: 42\r\n",
        "\r\n",
        "hello\r\n",
        "--BOUND--\r\n"
    );
    let mut content =
        MultipartContent::new(body.as_bytes(), CONTENT_TYPE).expect("multipart should initialize");

    let part = content
        .pop()
        .await
        .expect("headers should parse")
        .expect("part expected");

    let disposition = part.content_disposition().expect("disposition expected");
    assert_eq!(disposition.disposition, "attachment");
    assert_eq!(part.name(), Some("doc"));
    assert_eq!(part.file_name(), Some("résumé.txt"));

    let mime = part.content_type().expect("content type expected");
    assert_eq!(mime.essence_str(), "text/plain");
    assert_eq!(mime.get_param("charset").map(|value| value.as_str()), Some("utf-8"));

    assert_eq!(part.content_encoding(), ["gzip".to_owned()]);
    assert_eq!(part.content_length(), Some(5));
    assert_eq!(part.content_language(), ["en-US".to_owned(), "fr".to_owned()]);
    assert_eq!(
        part.headers()
            .other
            .get("x-upload-id")
            .and_then(|value| value.to_str().ok()),
        Some("42")
    );
    assert!(part.raw_headers().starts_with("Content-Disposition: attachment"));
    assert!(part.raw_headers().ends_with("X-Upload-Id: 42"));
}

#[tokio::test]
async fn into_part_keeps_metadata_and_skips_body() {
    let body = concat!(
        "--BOUND\r\n",
        "Content-Disposition: form-data; name=\"first\"\r\n",
        "\r\n",
        "skipped\r\n",
        "--BOUND\r\n",
        "Content-Disposition: form-data; name=\"second\"\r\n",
        "\r\n",
        "kept\r\n",
        "--BOUND--\r\n"
    );
    let mut content =
        MultipartContent::new(body.as_bytes(), CONTENT_TYPE).expect("multipart should initialize");

    let first = content
        .pop()
        .await
        .expect("headers should parse")
        .expect("part expected")
        .into_part();
    assert_eq!(first.name(), Some("first"));
    assert_eq!(first.index(), 0);

    let second = content
        .pop()
        .await
        .expect("headers should parse")
        .expect("part expected");
    assert_eq!(second.index(), 1);
    assert_eq!(second.text().await.expect("text"), "kept");
}

#[tokio::test]
async fn collect_pairs_metadata_with_body() {
    let body = concat!(
        "--BOUND\r\n",
        "Content-Disposition: form-data; name=\"blob\"; filename=\"b.bin\"\r\n",
        "\r\n",
        "\u{0}\u{1}\u{2}\r\n",
        "--BOUND--\r\n"
    );
    let mut content =
        MultipartContent::new(body.as_bytes(), CONTENT_TYPE).expect("multipart should initialize");

    let collected = content
        .pop()
        .await
        .expect("headers should parse")
        .expect("part expected")
        .collect()
        .await
        .expect("body should read");

    assert_eq!(collected.part.file_name(), Some("b.bin"));
    assert_eq!(&collected.body[..], &[0u8, 1, 2]);
}

#[tokio::test]
async fn text_rejects_invalid_utf8() {
    let mut body = b"--BOUND\r\nContent-Disposition: form-data; name=\"bin\"\r\n\r\n".to_vec();
    body.extend_from_slice(&[0xff, 0xfe]);
    body.extend_from_slice(b"\r\n--BOUND--\r\n");
    let mut content =
        MultipartContent::new(body.as_slice(), CONTENT_TYPE).expect("multipart should initialize");

    let part = content
        .pop()
        .await
        .expect("headers should parse")
        .expect("part expected");
    let err = part.text().await.expect_err("text must fail");
    assert!(matches!(err, MultipartError::InvalidUtf8));
}

#[tokio::test]
async fn non_utf8_headers_are_decoded_lossily() {
    let mut body = b"--BOUND\r\nContent-Disposition: form-data; name=\"".to_vec();
    body.push(0xff);
    body.extend_from_slice(b"\"\r\n\r\nvalue\r\n--BOUND--\r\n");
    let mut content =
        MultipartContent::new(body.as_slice(), CONTENT_TYPE).expect("multipart should initialize");

    let part = content
        .pop()
        .await
        .expect("headers should parse")
        .expect("part expected");
    assert_eq!(part.name(), Some("\u{fffd}"));
    assert_eq!(part.text().await.expect("text"), "value");
}

#[tokio::test]
async fn empty_read_target_does_not_end_the_body() {
    let body = "--BOUND\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue\r\n--BOUND--\r\n";
    let mut content =
        MultipartContent::new(body.as_bytes(), CONTENT_TYPE).expect("multipart should initialize");

    let mut part = content
        .pop()
        .await
        .expect("headers should parse")
        .expect("part expected");
    assert_eq!(part.read(&mut []).await.expect("empty read"), 0);
    assert!(!part.is_complete());
    assert_eq!(part.text().await.expect("text"), "value");
}
