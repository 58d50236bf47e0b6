use http::{HeaderMap, HeaderName, HeaderValue};

/// Parsed `Content-Disposition` metadata for a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentDisposition {
    /// Disposition type, typically `form-data`.
    pub disposition: String,
    /// Parsed field name (`name` parameter).
    pub name: Option<String>,
    /// Parsed file name (`filename`/`filename*` parameter).
    pub filename: Option<String>,
}

/// Header block of one part, with the content headers pulled into typed
/// fields and everything else passed through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartHeaders {
    /// Parsed `Content-Disposition`.
    pub content_disposition: Option<ContentDisposition>,
    /// Parsed `Content-Type`.
    pub content_type: Option<mime::Mime>,
    /// `Content-Encoding` tokens in declaration order.
    pub content_encoding: Vec<String>,
    /// Declared `Content-Length`.
    pub content_length: Option<u64>,
    /// `Content-Language` tokens in declaration order.
    pub content_language: Vec<String>,
    /// All remaining headers.
    pub other: HeaderMap,
}

impl PartHeaders {
    /// Returns the `name` parameter of `Content-Disposition`.
    pub fn name(&self) -> Option<&str> {
        self.content_disposition
            .as_ref()
            .and_then(|disposition| disposition.name.as_deref())
    }

    /// Returns the file name of `Content-Disposition`.
    pub fn file_name(&self) -> Option<&str> {
        self.content_disposition
            .as_ref()
            .and_then(|disposition| disposition.filename.as_deref())
    }
}

/// Parses a raw header block (CRLF separated lines, no trailing empty line).
///
/// Typed headers whose value does not parse are dropped, as are passthrough
/// headers that are not valid HTTP header names or values.
pub fn parse_header_block(raw: &str) -> PartHeaders {
    let mut headers = PartHeaders::default();

    for line in raw.split("\r\n") {
        if line.trim().is_empty() {
            continue;
        }

        let (name, value) = parse_header_line(line);

        if name.eq_ignore_ascii_case("content-disposition") {
            headers.content_disposition = parse_content_disposition(value);
        } else if name.eq_ignore_ascii_case("content-type") {
            headers.content_type = value.parse::<mime::Mime>().ok();
        } else if name.eq_ignore_ascii_case("content-encoding") {
            headers.content_encoding.extend(parse_tokens(value));
        } else if name.eq_ignore_ascii_case("content-length") {
            headers.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("content-language") {
            headers.content_language.extend(parse_tokens(value));
        } else if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            headers.other.append(name, value);
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(header = name, "part headers: dropping invalid header");
        }
    }

    headers
}

/// Splits a header line on its first `:` and trims both sides.
///
/// A line without a colon is a name with an empty value.
pub fn parse_header_line(line: &str) -> (&str, &str) {
    match line.split_once(':') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (line.trim(), ""),
    }
}

/// Splits a comma separated header value into trimmed, non-empty tokens.
pub fn parse_tokens(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parses a `Content-Disposition` value, returning `None` when it is malformed.
pub fn parse_content_disposition(value: &str) -> Option<ContentDisposition> {
    let mut params = param_segments(value);
    let disposition = params.next()?.to_ascii_lowercase();
    if disposition.is_empty() {
        return None;
    }

    let mut parsed = ContentDisposition {
        disposition,
        name: None,
        filename: None,
    };
    let mut extended_filename = None;

    for param in params.filter(|param| !param.is_empty()) {
        let (key, raw) = param.split_once('=')?;
        let value = param_value(raw.trim())?;

        if key.trim().eq_ignore_ascii_case("name") {
            parsed.name = Some(value);
        } else if key.trim().eq_ignore_ascii_case("filename") {
            parsed.filename = Some(percent_decode(&value).unwrap_or(value));
        } else if key.trim().eq_ignore_ascii_case("filename*") {
            extended_filename = ext_value(&value);
        }
    }

    if extended_filename.is_some() {
        parsed.filename = extended_filename;
    }
    Some(parsed)
}

// Quoted strings may be unescaped; bare tokens must not contain quotes.
fn param_value(raw: &str) -> Option<String> {
    match raw.strip_prefix('"') {
        Some(rest) => {
            let inner = rest.strip_suffix('"')?;
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                out.push(if c == '\\' { chars.next()? } else { c });
            }
            Some(out)
        }
        None if raw.contains('"') => None,
        None => Some(raw.to_owned()),
    }
}

// RFC 5987 `charset'language'value`, UTF-8 only.
fn ext_value(value: &str) -> Option<String> {
    let mut pieces = value.splitn(3, '\'');
    let charset = pieces.next()?;
    let _language = pieces.next()?;
    let encoded = pieces.next()?;
    charset
        .eq_ignore_ascii_case("utf-8")
        .then(|| percent_decode(encoded))
        .flatten()
}

fn percent_decode(value: &str) -> Option<String> {
    if !value.contains('%') {
        return Some(value.to_owned());
    }

    let mut decoded = Vec::with_capacity(value.len());
    let mut bytes = value.bytes();
    while let Some(b) = bytes.next() {
        if b != b'%' {
            decoded.push(b);
            continue;
        }
        let hi = (bytes.next()? as char).to_digit(16)?;
        let lo = (bytes.next()? as char).to_digit(16)?;
        decoded.push((hi * 16 + lo) as u8);
    }

    String::from_utf8(decoded).ok()
}

// Splits on `;` outside quoted strings, yielding trimmed slices.
fn param_segments(value: &str) -> impl Iterator<Item = &str> {
    let mut start = 0;
    let mut quoted = false;
    let mut escape = false;
    let mut cuts = Vec::new();

    for (pos, c) in value.char_indices() {
        if escape {
            escape = false;
        } else if quoted && c == '\\' {
            escape = true;
        } else if c == '"' {
            quoted = !quoted;
        } else if c == ';' && !quoted {
            cuts.push(&value[start..pos]);
            start = pos + 1;
        }
    }
    cuts.push(&value[start..]);

    cuts.into_iter().map(str::trim)
}
