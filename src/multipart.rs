use std::io;

use bytes::Buf;
use futures::Stream;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::{
    config::MultipartConfig,
    error::MultipartError,
    limits::Limits,
    parser::{extract_boundary, MultipartReader, MultipartSection},
    part::{CollectedPart, Part, PartBody},
};

/// Pull-based enumerator over the parts of a multipart body.
///
/// Parts come out one at a time. [`peek`](Self::peek) reads the next header
/// block without handing out the body, so a caller can look at a part's name
/// before deciding to consume it with [`pop`](Self::pop).
///
/// # Examples
///
/// ```
/// use partwise::MultipartContent;
///
/// # async fn run() -> Result<(), partwise::MultipartError> {
/// let body = "--X\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--X--\r\n";
/// let mut content = MultipartContent::new(body.as_bytes(), "multipart/form-data; boundary=X")?;
///
/// while let Some(part) = content.pop().await? {
///     let name = part.name().unwrap_or_default().to_owned();
///     println!("{name}: {}", part.text().await?);
/// }
/// # Ok(())
/// # }
/// # tokio::runtime::Builder::new_current_thread()
/// #     .build()
/// #     .unwrap()
/// #     .block_on(run())
/// #     .unwrap();
/// ```
#[derive(Debug)]
pub struct MultipartContent<R> {
    reader: MultipartReader<R>,
    peeked: Option<Part>,
    limits: Limits,
    buffer_size: usize,
    next_index: usize,
}

impl<R> MultipartContent<R> {
    /// Creates a multipart enumerator from a `Content-Type` value carrying a
    /// `boundary` parameter.
    pub fn new(reader: R, content_type: &str) -> Result<Self, MultipartError> {
        Self::with_config(reader, content_type, MultipartConfig::default())
    }

    /// Like [`new`](Self::new) with explicit configuration.
    pub fn with_config(
        reader: R,
        content_type: &str,
        config: MultipartConfig,
    ) -> Result<Self, MultipartError> {
        let boundary = extract_boundary(content_type)?;
        Self::with_boundary(reader, &boundary, config)
    }

    /// Creates a multipart enumerator from an already extracted boundary.
    pub fn with_boundary(
        reader: R,
        boundary: &str,
        config: MultipartConfig,
    ) -> Result<Self, MultipartError> {
        config.validate()?;

        Ok(Self {
            reader: MultipartReader::from_config(reader, boundary, &config)?,
            peeked: None,
            limits: config.limits,
            buffer_size: config.buffer_size,
            next_index: 0,
        })
    }

    /// Returns the section the underlying reader is positioned in.
    pub fn section(&self) -> MultipartSection {
        self.reader.section()
    }

    pub(crate) fn reader_mut(&mut self) -> &mut MultipartReader<R> {
        &mut self.reader
    }

    pub(crate) fn limits(&self) -> &Limits {
        &self.limits
    }

    pub(crate) fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl<S, B, E> MultipartContent<StreamReader<S, B>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: Buf + Unpin,
    E: Into<io::Error>,
{
    /// Creates a multipart enumerator over a stream of byte chunks.
    pub fn from_stream(stream: S, content_type: &str) -> Result<Self, MultipartError> {
        Self::new(StreamReader::new(stream), content_type)
    }
}

impl<R> MultipartContent<R>
where
    R: AsyncRead + Unpin,
{
    /// Returns the next part without consuming it.
    ///
    /// Repeated calls return the same part until it is popped.
    pub async fn peek(&mut self) -> Result<Option<&Part>, MultipartError> {
        if self.peeked.is_none() {
            self.peeked = self.read_part().await?;
        }

        Ok(self.peeked.as_ref())
    }

    /// Takes the next part, returning `None` once the epilogue is reached.
    ///
    /// Only the header block is read here; the body is streamed through the
    /// returned [`PartBody`].
    pub async fn pop(&mut self) -> Result<Option<PartBody<'_, R>>, MultipartError> {
        let part = match self.peeked.take() {
            Some(part) => Some(part),
            None => self.read_part().await?,
        };

        Ok(part.map(move |part| PartBody::new(self, part)))
    }

    /// Skips any remaining parts and reads the epilogue to the end of the
    /// stream, reporting malformed input found on the way.
    pub async fn finish(&mut self) -> Result<(), MultipartError> {
        self.peeked = None;

        loop {
            if let Some(error) = self.reader.source_error() {
                return Err(error.into());
            }
            if let Some(error) = self.reader.error() {
                return Err(error.into());
            }
            if self.reader.is_finished() {
                return Ok(());
            }

            let result = self.reader.skip_section().await?;
            if let Some(error) = result.error {
                return Err(error.into());
            }
        }
    }

    /// Turns the enumerator into a stream of fully read parts.
    ///
    /// The stream ends after the last part or after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<CollectedPart, MultipartError>> {
        futures::stream::try_unfold(self, |mut content| async move {
            let Some(body) = content.pop().await? else {
                return Ok(None);
            };
            let collected = body.collect().await?;
            Ok::<_, MultipartError>(Some((collected, content)))
        })
    }

    async fn read_part(&mut self) -> Result<Option<Part>, MultipartError> {
        loop {
            if let Some(error) = self.reader.source_error() {
                return Err(error.into());
            }
            if let Some(error) = self.reader.error() {
                return Err(error.into());
            }

            match self.reader.section() {
                MultipartSection::Headers => break,
                MultipartSection::Epilogue => return Ok(None),
                MultipartSection::Preamble | MultipartSection::Body => {
                    let result = self.reader.skip_section().await?;
                    if let Some(error) = result.error {
                        return Err(error.into());
                    }
                }
            }
        }

        let index = self.next_index;
        if !self.limits.part_allowed(index) {
            return Err(MultipartError::PartsLimitExceeded {
                max_parts: self.limits.max_parts.unwrap_or_default(),
            });
        }

        let raw_headers = self.read_header_block().await?;
        self.next_index += 1;

        let part = Part::new(index, raw_headers);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            index,
            name = part.name().unwrap_or("<unnamed>"),
            file_name = part.file_name().unwrap_or("<none>"),
            "multipart content: part headers read"
        );

        Ok(Some(part))
    }

    async fn read_header_block(&mut self) -> Result<String, MultipartError> {
        let mut chunk = vec![0u8; self.buffer_size];
        let mut raw = Vec::new();

        loop {
            let result = self.reader.read(Some(&mut chunk), self.buffer_size).await?;
            if let Some(error) = result.error {
                return Err(error.into());
            }

            raw.extend_from_slice(&chunk[..result.read]);
            if !self.limits.header_size_allowed(raw.len()) {
                return Err(MultipartError::HeaderSizeLimitExceeded {
                    max_header_size: self.limits.max_header_size.unwrap_or_default(),
                });
            }

            if result.end_of_part {
                return Ok(String::from_utf8_lossy(&raw).into_owned());
            }
        }
    }
}
