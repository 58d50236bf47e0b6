/// Content-Type boundary extraction.
pub mod boundary;
/// Delimiter-seeking read-ahead buffer.
pub mod buffer;
/// Part header block parsing.
pub mod headers;
/// Multipart section state machine.
pub mod reader;

pub use boundary::extract_boundary;
pub use buffer::{DelimitedBuffer, ReadResult, Validator, DEFAULT_BUFFER_SIZE};
pub use headers::{parse_content_disposition, parse_header_block, ContentDisposition, PartHeaders};
pub use reader::{MultipartReader, MultipartSection, SectionRead};
