use std::{io, time::Duration};

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ConfigError;

/// Default read-ahead window in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Outcome of a single delimiter-bounded read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadResult {
    /// Number of bytes copied (or skipped) by this read.
    pub read: usize,
    /// The delimiter directly followed the returned bytes and was consumed.
    pub end_of_section: bool,
    /// No bytes remain and no delimiter was found.
    pub end_of_stream: bool,
    /// The validator rejected the bytes at the cursor; they were not consumed.
    pub invalid: bool,
}

/// Rules applied to every scan position before the delimiter is reached.
#[derive(Debug, Clone, Copy, Default)]
pub enum Validator<'a> {
    /// Every byte is acceptable.
    #[default]
    None,
    /// None of these sequences may start at a scan position.
    Forbid(&'a [&'a [u8]]),
    /// Only these bytes may appear before the delimiter.
    Allow(&'a [u8]),
}

impl Validator<'_> {
    fn longest_token(&self) -> usize {
        match self {
            Self::Forbid(tokens) => tokens.iter().map(|token| token.len()).max().unwrap_or(0),
            Self::None | Self::Allow(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopKind {
    Delimiter,
    Invalid,
    Yield,
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
struct Stop {
    len: usize,
    kind: StopKind,
}

impl Stop {
    fn new(len: usize, kind: StopKind) -> Self {
        Self { len, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Match,
    Partial,
    Miss,
}

fn probe(rest: &[u8], token: &[u8], end: bool) -> Probe {
    if token.is_empty() {
        Probe::Miss
    } else if rest.starts_with(token) {
        Probe::Match
    } else if !end && rest.len() < token.len() && token.starts_with(rest) {
        Probe::Partial
    } else {
        Probe::Miss
    }
}

/// Read-ahead buffer that locates delimiters which may straddle refills.
///
/// The buffer only touches the underlying reader when the bytes it holds are
/// not enough to decide whether a delimiter (or a forbidden token) starts at
/// the cursor. Each refill compacts the unread bytes to the front and performs
/// exactly one read; a zero-byte read marks the end of the stream for good.
#[derive(Debug)]
pub struct DelimitedBuffer<R> {
    reader: R,
    buffer: Vec<u8>,
    offset: usize,
    size: usize,
    end: bool,
    beginning_of_stream: bool,
    read_timeout: Option<Duration>,
}

impl<R> DelimitedBuffer<R> {
    /// Creates a buffer with a read-ahead window of `capacity` bytes.
    pub fn new(reader: R, capacity: usize) -> Result<Self, ConfigError> {
        if capacity < 1 {
            return Err(ConfigError::InvalidBufferSize);
        }

        Ok(Self {
            reader,
            buffer: vec![0; capacity],
            offset: 0,
            size: 0,
            end: false,
            beginning_of_stream: true,
            read_timeout: None,
        })
    }

    /// Bounds every underlying read by `timeout`.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Returns the current window size in bytes.
    ///
    /// This starts at the configured capacity and grows to the longest token
    /// probed for.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` until the first read call.
    pub fn is_beginning_of_stream(&self) -> bool {
        self.beginning_of_stream
    }

    /// Returns `true` once the reader is at its end and every byte was consumed.
    pub fn is_exhausted(&self) -> bool {
        self.end && self.size == 0
    }

    /// Returns the underlying reader, discarding any buffered bytes.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn window(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.size]
    }

    fn advance(&mut self, count: usize) {
        self.size -= count;
        self.offset = if self.size == 0 { 0 } else { self.offset + count };
    }

    /// Finds where the next read must stop, or `None` when more bytes are
    /// needed to decide anything at the cursor.
    fn scan(&self, max_count: usize, delimiter: &[u8], validator: Validator<'_>) -> Option<Stop> {
        let window = self.window();
        let mut position = 0;

        loop {
            if position == window.len() {
                return if self.end {
                    Some(Stop::new(position, StopKind::Exhausted))
                } else if position == 0 {
                    None
                } else {
                    Some(Stop::new(position, StopKind::Yield))
                };
            }

            if position == max_count {
                return Some(Stop::new(position, StopKind::Yield));
            }

            let rest = &window[position..];
            let mut undecided = false;

            match probe(rest, delimiter, self.end) {
                Probe::Match => return Some(Stop::new(position, StopKind::Delimiter)),
                Probe::Partial => undecided = true,
                Probe::Miss => {}
            }

            if let Validator::Forbid(tokens) = validator {
                for token in tokens {
                    match probe(rest, token, self.end) {
                        Probe::Match => return Some(Stop::new(position, StopKind::Invalid)),
                        Probe::Partial => undecided = true,
                        Probe::Miss => {}
                    }
                }
            }

            if undecided {
                return if position == 0 {
                    None
                } else {
                    Some(Stop::new(position, StopKind::Yield))
                };
            }

            if let Validator::Allow(allowed) = validator {
                if !allowed.contains(&rest[0]) {
                    return Some(Stop::new(position, StopKind::Invalid));
                }
            }

            position += 1;
        }
    }

    fn consume(&mut self, out: Option<&mut [u8]>, stop: Stop, delimiter_len: usize) -> ReadResult {
        if let Some(out) = out {
            out[..stop.len].copy_from_slice(&self.buffer[self.offset..self.offset + stop.len]);
        }

        self.advance(stop.len);
        if stop.kind == StopKind::Delimiter {
            self.advance(delimiter_len);
        }

        ReadResult {
            read: stop.len,
            end_of_section: stop.kind == StopKind::Delimiter,
            end_of_stream: stop.kind == StopKind::Exhausted,
            invalid: stop.kind == StopKind::Invalid,
        }
    }
}

impl<R> DelimitedBuffer<R>
where
    R: AsyncRead + Unpin,
{
    /// Tests whether the unread bytes begin with `token`, reading more input
    /// if fewer than `token.len()` bytes are buffered. Never consumes.
    pub async fn starts_with(&mut self, token: &[u8]) -> io::Result<bool> {
        if token.is_empty() {
            return Ok(false);
        }

        while self.size < token.len() && !self.end {
            self.fill(token.len()).await?;
        }

        Ok(self.window().starts_with(token))
    }

    /// Copies up to `max_count` bytes into `out`, stopping before `delimiter`
    /// or before a position the validator rejects.
    ///
    /// A matched delimiter is consumed along with the returned bytes. Passing
    /// `None` for `out` discards the bytes instead. An empty delimiter makes
    /// this a no-op.
    ///
    /// # Panics
    ///
    /// Panics when `max_count` is zero or `out` is shorter than `max_count`.
    pub async fn read_to(
        &mut self,
        out: Option<&mut [u8]>,
        max_count: usize,
        delimiter: &[u8],
        validator: Validator<'_>,
    ) -> io::Result<ReadResult> {
        check_target(out.as_deref(), max_count);
        self.beginning_of_stream = false;

        if delimiter.is_empty() {
            return Ok(ReadResult {
                end_of_stream: self.is_exhausted(),
                ..ReadResult::default()
            });
        }

        self.scan_and_consume(out, max_count, delimiter, validator)
            .await
    }

    /// Copies up to `max_count` raw bytes into `out`, stopping with
    /// `invalid = true` when one of `invalid_tokens` starts at the cursor.
    ///
    /// # Panics
    ///
    /// Panics when `max_count` is zero or `out` is shorter than `max_count`.
    pub async fn read(
        &mut self,
        out: Option<&mut [u8]>,
        max_count: usize,
        invalid_tokens: &[&[u8]],
    ) -> io::Result<ReadResult> {
        check_target(out.as_deref(), max_count);
        self.beginning_of_stream = false;

        self.scan_and_consume(out, max_count, &[], Validator::Forbid(invalid_tokens))
            .await
    }

    /// Discards bytes up to and including `delimiter`.
    ///
    /// The returned `read` is the total number of bytes skipped, excluding
    /// the delimiter itself.
    pub async fn skip_to(
        &mut self,
        delimiter: &[u8],
        validator: Validator<'_>,
    ) -> io::Result<ReadResult> {
        let mut skipped = 0;

        loop {
            let result = self
                .read_to(None, DEFAULT_BUFFER_SIZE, delimiter, validator)
                .await?;
            skipped += result.read;

            if delimiter.is_empty()
                || result.end_of_section
                || result.end_of_stream
                || result.invalid
            {
                return Ok(ReadResult {
                    read: skipped,
                    ..result
                });
            }
        }
    }

    async fn scan_and_consume(
        &mut self,
        mut out: Option<&mut [u8]>,
        max_count: usize,
        delimiter: &[u8],
        validator: Validator<'_>,
    ) -> io::Result<ReadResult> {
        let window = delimiter.len().max(validator.longest_token());

        loop {
            match self.scan(max_count, delimiter, validator) {
                Some(stop) => return Ok(self.consume(out.take(), stop, delimiter.len())),
                None => self.fill(window).await?,
            }
        }
    }

    async fn fill(&mut self, min_capacity: usize) -> io::Result<()> {
        if self.end {
            return Ok(());
        }

        if self.offset > 0 {
            self.buffer
                .copy_within(self.offset..self.offset + self.size, 0);
            self.offset = 0;
        }

        if self.buffer.len() < min_capacity {
            #[cfg(feature = "tracing")]
            tracing::trace!(
                from = self.buffer.len(),
                to = min_capacity,
                "delimited buffer: growing window to fit token"
            );
            self.buffer.resize(min_capacity, 0);
        }

        if self.size == self.buffer.len() {
            return Ok(());
        }

        let target = &mut self.buffer[self.size..];
        let read = match self.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.reader.read(target))
                .await
                .map_err(|_| {
                    io::Error::new(io::ErrorKind::TimedOut, "timed out reading multipart body")
                })??,
            None => self.reader.read(target).await?,
        };

        if read == 0 {
            #[cfg(feature = "tracing")]
            tracing::trace!(buffered = self.size, "delimited buffer: end of stream");
            self.end = true;
        }

        self.size += read;
        Ok(())
    }
}

fn check_target(out: Option<&[u8]>, max_count: usize) {
    assert!(max_count > 0, "max_count must be greater than 0");
    if let Some(out) = out {
        assert!(
            out.len() >= max_count,
            "output buffer holds {} bytes but max_count is {max_count}",
            out.len()
        );
    }
}
