use std::{fmt, io};

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncRead;

use crate::{
    config::MultipartConfig,
    error::{ConfigError, ParseError},
    parser::buffer::{DelimitedBuffer, ReadResult, Validator, DEFAULT_BUFFER_SIZE},
};

// RFC 2046 5.1.1, without nested multipart bodies.

const CRLF: &[u8] = b"\r\n";
const BODY_DELIMITER: &[u8] = b"\r\n\r\n";
const EPILOGUE_POSTFIX: &[u8] = b"--";
const LINEAR_WHITESPACE: &[u8] = b" \r\n\t";

/// Classification of the bytes a [`MultipartReader`] is positioned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultipartSection {
    /// Ignorable bytes before the first boundary.
    Preamble,
    /// A part header block.
    Headers,
    /// A part body.
    Body,
    /// Ignorable bytes after the closing boundary.
    Epilogue,
}

impl fmt::Display for MultipartSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preamble => "preamble",
            Self::Headers => "headers",
            Self::Body => "body",
            Self::Epilogue => "epilogue",
        })
    }
}

/// Outcome of one [`MultipartReader::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRead {
    /// Number of bytes produced by this call.
    pub read: usize,
    /// Section the produced bytes belong to.
    pub section: MultipartSection,
    /// The section ended with these bytes.
    pub end_of_part: bool,
    /// The epilogue, and with it the whole body, is exhausted.
    pub end_of_stream: bool,
    /// Malformed input detected at the end of the produced bytes.
    pub error: Option<ParseError>,
}

impl SectionRead {
    fn new(section: MultipartSection, result: ReadResult) -> Self {
        Self {
            read: result.read,
            section,
            end_of_part: result.end_of_section,
            end_of_stream: false,
            error: None,
        }
    }

    fn empty_part(section: MultipartSection) -> Self {
        Self {
            read: 0,
            section,
            end_of_part: true,
            end_of_stream: false,
            error: None,
        }
    }

    fn failed(section: MultipartSection, read: usize, error: ParseError) -> Self {
        Self {
            read,
            section,
            end_of_part: false,
            end_of_stream: false,
            error: Some(error),
        }
    }

    fn finished(read: usize) -> Self {
        Self {
            read,
            section: MultipartSection::Epilogue,
            end_of_part: true,
            end_of_stream: true,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    Headers { empty: bool },
    Body,
    Epilogue,
    Finished,
    Failed(MultipartSection, ParseError),
    // The source failed with bytes of a delimiter possibly consumed.
    Broken(MultipartSection, io::ErrorKind),
}

impl State {
    fn section(self) -> MultipartSection {
        match self {
            Self::Preamble => MultipartSection::Preamble,
            Self::Headers { .. } => MultipartSection::Headers,
            Self::Body => MultipartSection::Body,
            Self::Epilogue | Self::Finished => MultipartSection::Epilogue,
            Self::Failed(section, _) | Self::Broken(section, _) => section,
        }
    }

    fn fail(section: MultipartSection, read: usize, error: ParseError) -> (Self, SectionRead) {
        #[cfg(feature = "tracing")]
        tracing::debug!(%section, %error, "multipart reader: malformed body");

        (
            Self::Failed(section, error),
            SectionRead::failed(section, read, error),
        )
    }
}

fn source_failed(kind: io::ErrorKind) -> io::Error {
    io::Error::new(kind, "multipart source failed in an earlier read")
}

/// Section state machine over a multipart body.
///
/// Every [`read`](Self::read) call returns bytes from a single section and
/// never loops across part boundaries, so memory stays bounded by the buffer
/// window no matter how large the body is.
#[derive(Debug)]
pub struct MultipartReader<R> {
    buffer: DelimitedBuffer<R>,
    boundary: Vec<u8>,
    boundary_line: Vec<u8>,
    allow_empty: bool,
    state: State,
}

impl<R> MultipartReader<R> {
    /// Creates a reader for `boundary` (without the leading `--`).
    pub fn new(reader: R, boundary: &str, capacity: usize) -> Result<Self, ConfigError> {
        if boundary.is_empty() {
            return Err(ConfigError::MissingBoundary);
        }

        Ok(Self {
            buffer: DelimitedBuffer::new(reader, capacity)?,
            boundary: format!("--{boundary}").into_bytes(),
            boundary_line: format!("\r\n--{boundary}").into_bytes(),
            allow_empty: true,
            state: State::Preamble,
        })
    }

    /// Creates a reader using the buffer size, read timeout and empty-body
    /// policy of `config`.
    pub fn from_config(
        reader: R,
        boundary: &str,
        config: &MultipartConfig,
    ) -> Result<Self, ConfigError> {
        let mut multipart = Self::new(reader, boundary, config.buffer_size)?;
        multipart.buffer = multipart.buffer.with_read_timeout(config.read_timeout);
        multipart.allow_empty = config.allow_empty;
        Ok(multipart)
    }

    /// Returns the section the next read produces bytes from.
    pub fn section(&self) -> MultipartSection {
        self.state.section()
    }

    /// Returns `true` once the epilogue is exhausted.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Returns `true` once the byte source failed. Every further read
    /// reports an I/O error of the same kind.
    pub fn is_broken(&self) -> bool {
        matches!(self.state, State::Broken(..))
    }

    /// Returns an I/O error of the kind that broke the byte source, if any.
    pub fn source_error(&self) -> Option<io::Error> {
        match self.state {
            State::Broken(_, kind) => Some(source_failed(kind)),
            _ => None,
        }
    }

    /// Returns the error that stopped this reader, if any.
    pub fn error(&self) -> Option<ParseError> {
        match self.state {
            State::Failed(_, error) => Some(error),
            _ => None,
        }
    }
}

impl<R> MultipartReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Reads up to `max_count` bytes of the current section into `out`.
    ///
    /// `None` discards the bytes. Once an error is reported every further
    /// call reports it again without reading. An I/O error from the source
    /// leaves the reader broken, since part of a delimiter may already be
    /// consumed.
    ///
    /// # Panics
    ///
    /// Panics when `max_count` is zero or `out` is shorter than `max_count`.
    pub async fn read(
        &mut self,
        out: Option<&mut [u8]>,
        max_count: usize,
    ) -> io::Result<SectionRead> {
        let current = self.state;
        let step = match current {
            State::Preamble => self.read_preamble(out, max_count).await,
            State::Headers { empty: true } => Ok((
                State::Body,
                SectionRead::empty_part(MultipartSection::Headers),
            )),
            State::Headers { empty: false } => self.read_headers(out, max_count).await,
            State::Body => self.read_body(out, max_count).await,
            State::Epilogue => self.read_epilogue(out, max_count).await,
            State::Finished => Ok((State::Finished, SectionRead::finished(0))),
            State::Failed(section, error) => Ok((current, SectionRead::failed(section, 0, error))),
            State::Broken(_, kind) => return Err(source_failed(kind)),
        };

        let (state, outcome) = match step {
            Ok(step) => step,
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(section = %current.section(), %error, "multipart reader: source failed");

                self.state = State::Broken(current.section(), error.kind());
                return Err(error);
            }
        };

        #[cfg(feature = "tracing")]
        if state.section() != current.section() {
            tracing::trace!(
                from = %current.section(),
                to = %state.section(),
                "multipart reader: section transition"
            );
        }

        self.state = state;
        Ok(outcome)
    }

    /// Discards the rest of the current section.
    ///
    /// The returned read carries the total number of bytes skipped.
    pub async fn skip_section(&mut self) -> io::Result<SectionRead> {
        let mut skipped = 0;

        loop {
            let result = self.read(None, DEFAULT_BUFFER_SIZE).await?;
            skipped += result.read;
            if result.end_of_part || result.error.is_some() {
                return Ok(SectionRead {
                    read: skipped,
                    ..result
                });
            }
        }
    }

    /// Collects the rest of the current section.
    pub async fn read_section(&mut self) -> io::Result<(Bytes, SectionRead)> {
        let mut chunk = vec![0u8; DEFAULT_BUFFER_SIZE];
        let mut data = BytesMut::new();

        loop {
            let result = self.read(Some(&mut chunk), DEFAULT_BUFFER_SIZE).await?;
            data.extend_from_slice(&chunk[..result.read]);
            if result.end_of_part || result.error.is_some() {
                return Ok((data.freeze(), result));
            }
        }
    }

    /// Collects the rest of the current section as UTF-8 text, replacing
    /// invalid sequences.
    pub async fn read_section_string(&mut self) -> io::Result<(String, SectionRead)> {
        let (data, result) = self.read_section().await?;
        Ok((String::from_utf8_lossy(&data).into_owned(), result))
    }

    async fn read_preamble(
        &mut self,
        out: Option<&mut [u8]>,
        max_count: usize,
    ) -> io::Result<(State, SectionRead)> {
        let section = MultipartSection::Preamble;
        let bare_first_boundary = self.buffer.is_beginning_of_stream()
            && self.buffer.starts_with(&self.boundary).await?;

        let result = if bare_first_boundary {
            self.buffer
                .read_to(out, max_count, &self.boundary, Validator::None)
                .await?
        } else {
            self.buffer
                .read_to(
                    out,
                    max_count,
                    &self.boundary_line,
                    Validator::Forbid(&[self.boundary.as_slice()]),
                )
                .await?
        };

        if result.invalid {
            return Ok(State::fail(section, result.read, ParseError::BoundaryNotPrecededByCrlf));
        }
        if result.end_of_stream {
            return Ok(State::fail(section, result.read, ParseError::UnexpectedEndOfStream));
        }
        if !result.end_of_section {
            return Ok((State::Preamble, SectionRead::new(section, result)));
        }

        match self.read_boundary().await? {
            Ok(State::Epilogue) if !self.allow_empty => {
                Ok(State::fail(section, result.read, ParseError::UnexpectedEndOfStream))
            }
            Ok(next) => Ok((next, SectionRead::new(section, result))),
            Err(error) => Ok(State::fail(section, result.read, error)),
        }
    }

    async fn read_headers(
        &mut self,
        out: Option<&mut [u8]>,
        max_count: usize,
    ) -> io::Result<(State, SectionRead)> {
        let section = MultipartSection::Headers;
        let result = self
            .buffer
            .read_to(
                out,
                max_count,
                BODY_DELIMITER,
                Validator::Forbid(&[self.boundary_line.as_slice(), self.boundary.as_slice()]),
            )
            .await?;

        if result.invalid {
            return Ok(State::fail(section, result.read, ParseError::HeadersNotTerminated));
        }
        if result.end_of_stream {
            return Ok(State::fail(section, result.read, ParseError::UnexpectedEndOfStream));
        }

        let next = if result.end_of_section {
            State::Body
        } else {
            State::Headers { empty: false }
        };
        Ok((next, SectionRead::new(section, result)))
    }

    async fn read_body(
        &mut self,
        out: Option<&mut [u8]>,
        max_count: usize,
    ) -> io::Result<(State, SectionRead)> {
        let section = MultipartSection::Body;
        let result = self
            .buffer
            .read_to(
                out,
                max_count,
                &self.boundary_line,
                Validator::Forbid(&[self.boundary.as_slice()]),
            )
            .await?;

        if result.invalid {
            return Ok(State::fail(section, result.read, ParseError::BoundaryNotPrecededByCrlf));
        }
        if result.end_of_stream {
            return Ok(State::fail(section, result.read, ParseError::UnexpectedEndOfStream));
        }
        if !result.end_of_section {
            return Ok((State::Body, SectionRead::new(section, result)));
        }

        match self.read_boundary().await? {
            Ok(next) => Ok((next, SectionRead::new(section, result))),
            Err(error) => Ok(State::fail(section, result.read, error)),
        }
    }

    /// Consumes what follows a matched boundary token and decides the next
    /// state: the `--` postfix, linear whitespace, then CRLF.
    async fn read_boundary(&mut self) -> io::Result<Result<State, ParseError>> {
        let closing = self.buffer.starts_with(EPILOGUE_POSTFIX).await?;
        if closing {
            self.buffer
                .read_to(None, EPILOGUE_POSTFIX.len(), EPILOGUE_POSTFIX, Validator::None)
                .await?;
        }

        let trailer = self
            .buffer
            .skip_to(CRLF, Validator::Allow(LINEAR_WHITESPACE))
            .await?;

        if trailer.invalid {
            return Ok(Err(ParseError::InvalidBoundaryCharacters));
        }
        if closing {
            return Ok(Ok(State::Epilogue));
        }
        if trailer.end_of_stream {
            return Ok(Err(ParseError::UnexpectedEndOfStream));
        }

        if !self.buffer.starts_with(CRLF).await? {
            return Ok(Ok(State::Headers { empty: false }));
        }

        // An empty header block. When the CRLF opens the next boundary line
        // it belongs to that delimiter and the body is empty too.
        if !self.buffer.starts_with(&self.boundary_line).await? {
            self.buffer
                .read_to(None, CRLF.len(), CRLF, Validator::None)
                .await?;
        }

        Ok(Ok(State::Headers { empty: true }))
    }

    async fn read_epilogue(
        &mut self,
        out: Option<&mut [u8]>,
        max_count: usize,
    ) -> io::Result<(State, SectionRead)> {
        let section = MultipartSection::Epilogue;
        let result = self
            .buffer
            .read(
                out,
                max_count,
                &[self.boundary_line.as_slice(), self.boundary.as_slice()],
            )
            .await?;

        if result.invalid {
            return Ok(State::fail(
                section,
                result.read,
                ParseError::BoundaryAfterClosingBoundary,
            ));
        }
        if result.end_of_stream {
            return Ok((State::Finished, SectionRead::finished(result.read)));
        }

        Ok((State::Epilogue, SectionRead::new(section, result)))
    }
}
