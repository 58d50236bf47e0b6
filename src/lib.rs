#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Streaming reader for RFC 2046 `multipart` bodies.
//!
//! The low-level [`parser::MultipartReader`] walks a body section by section
//! (preamble, part headers, part body, epilogue) with bounded memory. On top
//! of it, [`MultipartContent`] enumerates parts with `peek`/`pop`, parsing
//! each header block into a [`Part`] and handing out its body as a
//! forward-only [`PartBody`].

/// Fluent builder API.
pub mod builder;
/// Multipart decoding configuration.
pub mod config;
/// Error types exposed by this crate.
pub mod error;
/// Part header and body limits.
pub mod limits;
/// Part enumerator over a multipart body.
pub mod multipart;
/// Parsed multipart part API.
pub mod part;
/// Low-level parser components.
pub mod parser;

#[cfg(feature = "hyper")]
pub mod hyper;

pub use builder::MultipartBuilder;
pub use config::MultipartConfig;
pub use error::{ConfigError, MultipartError, ParseError};
pub use limits::Limits;
pub use multipart::MultipartContent;
pub use parser::{
    extract_boundary, ContentDisposition, MultipartReader, MultipartSection, PartHeaders,
    SectionRead,
};
pub use part::{CollectedPart, Part, PartBody};
