use thiserror::Error;

/// Construction-time configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The read-ahead buffer was configured with a zero capacity.
    #[error("buffer size must be greater than 0")]
    InvalidBufferSize,
    /// The `Content-Type` header carried no `boundary` parameter.
    #[error("no boundary specified in the Content-Type header")]
    MissingBoundary,
    /// The `Content-Type` header could not be used for multipart decoding.
    #[error("invalid Content-Type header: {reason}")]
    InvalidContentType {
        /// Why the header was rejected.
        reason: &'static str,
    },
    /// The `boundary` parameter is not a valid RFC 2046 boundary.
    #[error("invalid multipart boundary: {reason}")]
    InvalidBoundary {
        /// Why the boundary was rejected.
        reason: &'static str,
    },
    /// A configured numeric limit must be strictly greater than zero.
    #[error("limit `{limit}` must be greater than 0")]
    InvalidLimitValue {
        /// Name of the limit.
        limit: &'static str,
    },
}

/// Malformed multipart body conditions detected by the section reader.
///
/// The set is closed and every variant renders a fixed message, so callers
/// can assert on it or forward it to a client verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ParseError {
    /// A boundary appeared without the CRLF that must precede it.
    #[error("Boundary not preceded by CRLF.")]
    BoundaryNotPrecededByCrlf,
    /// A boundary appeared inside a header block before the empty line.
    #[error("Headers not followed by empty line.")]
    HeadersNotTerminated,
    /// The body ended before the closing boundary.
    #[error("Unexpected end of stream.")]
    UnexpectedEndOfStream,
    /// Something other than linear whitespace followed a boundary.
    #[error("Invalid characters following boundary.")]
    InvalidBoundaryCharacters,
    /// A boundary appeared in the epilogue.
    #[error("Boundary found after closing boundary.")]
    BoundaryAfterClosingBoundary,
}

/// Runtime error type used by `partwise`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MultipartError {
    /// Configuration error surfaced at runtime.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The multipart body is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Reading the underlying byte source failed or timed out.
    #[error("stream read failed: {0}")]
    Io(#[from] std::io::Error),
    /// A part header block exceeded the configured size limit.
    #[error("part header block exceeded max header size of {max_header_size} bytes")]
    HeaderSizeLimitExceeded {
        /// Maximum allowed header block size in bytes.
        max_header_size: usize,
    },
    /// The number of parts exceeded the configured limit.
    #[error("multipart body exceeded max parts limit of {max_parts}")]
    PartsLimitExceeded {
        /// Maximum allowed number of parts.
        max_parts: usize,
    },
    /// A part body exceeded the configured size limit.
    #[error("part `{part}` exceeded max part size of {max_part_size} bytes")]
    PartSizeLimitExceeded {
        /// Name of the offending part, or `<unnamed>`.
        part: String,
        /// Maximum allowed body size in bytes.
        max_part_size: u64,
    },
    /// A part body read as text is not valid UTF-8.
    #[error("part body is not valid UTF-8")]
    InvalidUtf8,
}

impl MultipartError {
    /// Returns the parse condition when this error reports a malformed body.
    pub fn parse_error(&self) -> Option<ParseError> {
        match self {
            Self::Parse(err) => Some(*err),
            _ => None,
        }
    }
}

impl From<MultipartError> for std::io::Error {
    fn from(err: MultipartError) -> Self {
        match err {
            MultipartError::Io(err) => err,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}
