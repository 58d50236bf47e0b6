use crate::error::ConfigError;

const MAX_BOUNDARY_LEN: usize = 70;

/// Extracts and validates the `boundary` parameter from a `Content-Type` value.
///
/// Any `multipart/*` media type is accepted; the boundary may be quoted and
/// may use percent-encoding.
pub fn extract_boundary(content_type: &str) -> Result<String, ConfigError> {
    let mime = content_type
        .parse::<mime::Mime>()
        .map_err(|_| ConfigError::InvalidContentType {
            reason: "not a valid media type",
        })?;

    if mime.type_() != mime::MULTIPART {
        return Err(ConfigError::InvalidContentType {
            reason: "media type must be multipart",
        });
    }

    let boundary = mime
        .get_param(mime::BOUNDARY)
        .map(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingBoundary)?;

    let boundary = decode_percent_encoding(boundary)?;
    validate_boundary(&boundary)?;
    Ok(boundary)
}

fn validate_boundary(boundary: &str) -> Result<(), ConfigError> {
    if boundary.len() > MAX_BOUNDARY_LEN {
        return Err(ConfigError::InvalidBoundary {
            reason: "boundary cannot exceed 70 characters",
        });
    }

    if boundary.ends_with(' ') {
        return Err(ConfigError::InvalidBoundary {
            reason: "boundary cannot end with whitespace",
        });
    }

    if !boundary.chars().all(is_boundary_char) {
        return Err(ConfigError::InvalidBoundary {
            reason: "boundary contains invalid characters",
        });
    }

    Ok(())
}

fn decode_percent_encoding(boundary: &str) -> Result<String, ConfigError> {
    const MALFORMED: ConfigError = ConfigError::InvalidBoundary {
        reason: "invalid percent-encoding in boundary",
    };

    if !boundary.as_bytes().contains(&b'%') {
        return Ok(boundary.to_owned());
    }

    let raw = boundary.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut index = 0;

    while index < raw.len() {
        if raw[index] == b'%' {
            if index + 2 >= raw.len() {
                return Err(MALFORMED);
            }
            let hi = hex_value(raw[index + 1]).ok_or(MALFORMED)?;
            let lo = hex_value(raw[index + 2]).ok_or(MALFORMED)?;
            bytes.push((hi << 4) | lo);
            index += 3;
            continue;
        }

        bytes.push(raw[index]);
        index += 1;
    }

    String::from_utf8(bytes).map_err(|_| ConfigError::InvalidBoundary {
        reason: "percent-encoded boundary is not valid UTF-8",
    })
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn is_boundary_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '\'' | '(' | ')' | '+' | '_' | ',' | '-' | '.' | '/' | ':' | '=' | '?' | ' '
        )
}
