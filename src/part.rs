use std::ops::Deref;

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio::io::AsyncRead;

use crate::{
    error::MultipartError,
    multipart::MultipartContent,
    parser::headers::{parse_header_block, ContentDisposition, PartHeaders},
};

/// One part of a multipart body: its header block, parsed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    index: usize,
    raw_headers: String,
    headers: PartHeaders,
}

impl Part {
    pub(crate) fn new(index: usize, raw_headers: String) -> Self {
        let headers = parse_header_block(&raw_headers);
        Self {
            index,
            raw_headers,
            headers,
        }
    }

    /// Returns the zero-based position of this part in the body.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the `name` parameter of `Content-Disposition`.
    pub fn name(&self) -> Option<&str> {
        self.headers.name()
    }

    /// Returns the optional file name for this part.
    pub fn file_name(&self) -> Option<&str> {
        self.headers.file_name()
    }

    /// Returns the parsed `Content-Disposition`.
    pub fn content_disposition(&self) -> Option<&ContentDisposition> {
        self.headers.content_disposition.as_ref()
    }

    /// Returns the parsed `Content-Type`.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.headers.content_type.as_ref()
    }

    /// Returns the `Content-Encoding` tokens.
    pub fn content_encoding(&self) -> &[String] {
        &self.headers.content_encoding
    }

    /// Returns the declared `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        self.headers.content_length
    }

    /// Returns the `Content-Language` tokens.
    pub fn content_language(&self) -> &[String] {
        &self.headers.content_language
    }

    /// Returns parsed part headers.
    pub fn headers(&self) -> &PartHeaders {
        &self.headers
    }

    /// Returns the header block as received.
    pub fn raw_headers(&self) -> &str {
        &self.raw_headers
    }
}

/// A part paired with its fully read body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedPart {
    /// Part metadata.
    pub part: Part,
    /// Complete body bytes.
    pub body: Bytes,
}

/// Read-only, forward-only body of the part most recently popped from a
/// [`MultipartContent`].
///
/// The body borrows the content it came from, so it can not be kept past the
/// next `pop`. Any unread remainder is skipped when the next part is read.
#[derive(Debug)]
pub struct PartBody<'a, R> {
    content: &'a mut MultipartContent<R>,
    part: Part,
    read: u64,
    done: bool,
}

impl<'a, R> PartBody<'a, R> {
    pub(crate) fn new(content: &'a mut MultipartContent<R>, part: Part) -> Self {
        Self {
            content,
            part,
            read: 0,
            done: false,
        }
    }

    /// Returns part metadata.
    pub fn part(&self) -> &Part {
        &self.part
    }

    /// Gives up the body and keeps the metadata.
    pub fn into_part(self) -> Part {
        self.part
    }

    /// Body length is never known up front.
    pub fn size_hint(&self) -> Option<u64> {
        None
    }

    /// Returns `true` once the whole body was read.
    pub fn is_complete(&self) -> bool {
        self.done
    }
}

impl<'a, R> PartBody<'a, R>
where
    R: AsyncRead + Unpin,
{
    /// Reads body bytes into `out`, returning 0 once the body is complete.
    ///
    /// An empty `out` also returns 0 without reading; check
    /// [`is_complete`](Self::is_complete) to tell the two apart.
    pub async fn read(&mut self, out: &mut [u8]) -> Result<usize, MultipartError> {
        if self.done || out.is_empty() {
            return Ok(0);
        }

        let max_count = out.len();
        let result = self.content.reader_mut().read(Some(out), max_count).await?;

        if let Some(error) = result.error {
            self.done = true;
            return Err(error.into());
        }

        self.read += result.read as u64;
        let limits = self.content.limits();
        if !limits.part_size_allowed(self.read) {
            self.done = true;
            return Err(MultipartError::PartSizeLimitExceeded {
                part: self.part.name().unwrap_or("<unnamed>").to_owned(),
                max_part_size: limits.max_part_size.unwrap_or_default(),
            });
        }

        if result.end_of_part {
            #[cfg(feature = "tracing")]
            tracing::trace!(index = self.part.index(), size = self.read, "part body: complete");
            self.done = true;
        }

        Ok(result.read)
    }

    /// Reads the next chunk of at most one buffer window.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, MultipartError> {
        if self.done {
            return Ok(None);
        }

        let mut chunk = vec![0u8; self.content.buffer_size()];
        let read = self.read(&mut chunk).await?;
        if read == 0 {
            return Ok(None);
        }

        chunk.truncate(read);
        Ok(Some(Bytes::from(chunk)))
    }

    /// Reads the rest of the body and pairs it with the metadata.
    pub async fn collect(mut self) -> Result<CollectedPart, MultipartError> {
        let mut body = BytesMut::new();
        while let Some(chunk) = self.chunk().await? {
            body.extend_from_slice(&chunk);
        }

        Ok(CollectedPart {
            part: self.part,
            body: body.freeze(),
        })
    }

    /// Reads the rest of the body as bytes.
    pub async fn bytes(self) -> Result<Bytes, MultipartError> {
        Ok(self.collect().await?.body)
    }

    /// Reads the rest of the body and decodes it as UTF-8 text.
    pub async fn text(self) -> Result<String, MultipartError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| MultipartError::InvalidUtf8)
    }

    /// Turns the body into a stream of chunks.
    pub fn stream(self) -> impl Stream<Item = Result<Bytes, MultipartError>> + 'a
    where
        R: 'a,
    {
        futures::stream::try_unfold(self, |mut body| async move {
            let chunk = body.chunk().await?;
            Ok::<_, MultipartError>(chunk.map(|chunk| (chunk, body)))
        })
    }
}

impl<R> Deref for PartBody<'_, R> {
    type Target = Part;

    fn deref(&self) -> &Part {
        &self.part
    }
}
