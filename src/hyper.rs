//! Hyper input adapter.
//!
//! Turns a Hyper request into a [`MultipartContent`] over its body stream.

use std::{io, pin::Pin};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http_body_util::BodyExt;
use hyper::{header, Request};
use tokio_util::io::StreamReader;

use crate::{ConfigError, MultipartConfig, MultipartContent, MultipartError};

/// Hyper body stream mapped into I/O errors.
pub type HyperBodyBoxStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;
/// Byte source a request body is read through.
pub type HyperBodyReader = StreamReader<HyperBodyBoxStream, Bytes>;

/// Extracts the raw `Content-Type` header from a Hyper request.
pub fn content_type_from_request<B>(request: &Request<B>) -> Result<&str, ConfigError> {
    let value = request
        .headers()
        .get(header::CONTENT_TYPE)
        .ok_or(ConfigError::InvalidContentType {
            reason: "missing Content-Type header",
        })?;
    value.to_str().map_err(|_| ConfigError::InvalidContentType {
        reason: "Content-Type header must be ASCII",
    })
}

/// Maps a Hyper body into a boxed stream of byte chunks.
pub fn map_body_stream<B>(body: B) -> HyperBodyBoxStream
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let stream = body.into_data_stream().map(|item| item.map_err(io::Error::other));
    Box::pin(stream)
}

/// Creates a multipart enumerator from a Hyper request with default
/// configuration.
pub fn multipart_from_request<B>(
    request: Request<B>,
) -> Result<MultipartContent<HyperBodyReader>, MultipartError>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    multipart_from_request_with_config(request, MultipartConfig::default())
}

/// Creates a multipart enumerator from a Hyper request.
pub fn multipart_from_request_with_config<B>(
    request: Request<B>,
    config: MultipartConfig,
) -> Result<MultipartContent<HyperBodyReader>, MultipartError>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let content_type = content_type_from_request(&request)?.to_owned();
    let reader = StreamReader::new(map_body_stream(request.into_body()));

    #[cfg(feature = "tracing")]
    tracing::debug!(content_type = %content_type, "hyper: multipart request accepted");

    MultipartContent::with_config(reader, &content_type, config)
}
