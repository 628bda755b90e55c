//! Binary-safe `multipart/form-data` decoding.
//!
//! Delimiters and header terminators are located on the raw body bytes and
//! file content is sliced out of the original buffer. Only the header block of
//! each part is ever converted to text.

use bytes::Bytes;
use capture_core::AppError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

const CRLF: &[u8] = b"\r\n";
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const MAX_BOUNDARY_LEN: usize = 70;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bname="([^"]+)""#).unwrap());

static FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bfilename="([^"]*)""#).unwrap());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    #[error("Multipart part is missing a Content-Disposition header")]
    MissingContentDisposition,

    #[error("Multipart Content-Disposition has no field name")]
    MissingFieldName,

    #[error("{0}")]
    BadBoundary(String),
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        match err {
            MultipartError::MissingContentDisposition => AppError::MissingContentDisposition,
            MultipartError::MissingFieldName => AppError::MissingFieldName,
            MultipartError::BadBoundary(reason) => AppError::BadMultipartBoundary(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    File { filename: String, content: Bytes },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedField {
    pub name: String,
    pub value: FieldValue,
}

/// Fields of a decoded body keyed by name. A repeated name keeps its last part.
#[derive(Debug, Clone, Default)]
pub struct DecodedForm {
    fields: HashMap<String, DecodedField>,
}

impl DecodedForm {
    pub fn get(&self, name: &str) -> Option<&DecodedField> {
        self.fields.get(name)
    }

    /// Content of the file field `name`, if that field carried a filename.
    pub fn file(&self, name: &str) -> Option<&Bytes> {
        match self.fields.get(name).map(|f| &f.value) {
            Some(FieldValue::File { content, .. }) => Some(content),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name).map(|f| &f.value) {
            Some(FieldValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Whether a `Content-Type` value announces a multipart form.
pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("multipart/form-data"))
        .unwrap_or(false)
}

/// Extract the `boundary` parameter of a `multipart/form-data` content type.
pub fn boundary_from_content_type(content_type: &str) -> Result<String, MultipartError> {
    if !is_multipart(content_type) {
        return Err(MultipartError::BadBoundary(format!(
            "expected multipart/form-data, got '{}'",
            content_type
        )));
    }

    let boundary = content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .ok_or_else(|| MultipartError::BadBoundary("missing boundary parameter".to_string()))?;

    validate_boundary(&boundary)?;
    Ok(boundary)
}

fn validate_boundary(boundary: &str) -> Result<(), MultipartError> {
    if boundary.is_empty() {
        return Err(MultipartError::BadBoundary("empty boundary".to_string()));
    }
    if boundary.len() > MAX_BOUNDARY_LEN {
        return Err(MultipartError::BadBoundary(format!(
            "boundary longer than {} characters",
            MAX_BOUNDARY_LEN
        )));
    }
    Ok(())
}

/// Decode `body` into its fields. `boundary` is given without the leading `--`.
pub fn decode(body: &Bytes, boundary: &str) -> Result<DecodedForm, MultipartError> {
    validate_boundary(boundary)?;

    let delimiter = format!("--{}", boundary).into_bytes();
    let positions = delimiter_positions(body, &delimiter);
    if positions.is_empty() {
        return Err(MultipartError::BadBoundary(
            "no boundary delimiter found in body".to_string(),
        ));
    }

    let mut form = DecodedForm::default();

    for (index, &position) in positions.iter().enumerate() {
        let after_delimiter = position + delimiter.len();
        if body[after_delimiter..].starts_with(b"--") {
            break;
        }

        let start = skip_line_end(body, after_delimiter);
        let end = match positions.get(index + 1) {
            // The CRLF before the next delimiter belongs to the delimiter.
            Some(&next) => next - CRLF.len(),
            None => trim_trailing_crlf(body, body.len()),
        };
        if start >= end {
            continue;
        }

        if let Some(field) = decode_part(body, start, end)? {
            tracing::trace!(field = %field.name, "Decoded multipart field");
            form.fields.insert(field.name.clone(), field);
        }
    }

    Ok(form)
}

fn decode_part(body: &Bytes, start: usize, end: usize) -> Result<Option<DecodedField>, MultipartError> {
    let part = &body[start..end];
    if part.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let header_len =
        find(part, HEADER_TERMINATOR, 0).ok_or(MultipartError::MissingContentDisposition)?;
    let headers = String::from_utf8_lossy(&part[..header_len]);

    let disposition = headers
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-disposition"))
        .map(|(_, value)| value.trim())
        .ok_or(MultipartError::MissingContentDisposition)?;

    let name = NAME_RE
        .captures(disposition)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(MultipartError::MissingFieldName)?;

    let filename = FILENAME_RE
        .captures(disposition)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let content_start = start + header_len + HEADER_TERMINATOR.len();

    let value = match filename {
        Some(filename) => FieldValue::File {
            filename,
            content: body.slice(content_start..end),
        },
        None => {
            let text = String::from_utf8_lossy(&body[content_start..end]);
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            FieldValue::Text(text.to_string())
        }
    };

    Ok(Some(DecodedField { name, value }))
}

/// Offsets of every delimiter that starts a line and is followed by a line end,
/// transport padding, the closing `--` or the end of the buffer.
fn delimiter_positions(body: &[u8], delimiter: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;

    while let Some(position) = find(body, delimiter, from) {
        from = position + 1;

        let line_start = position == 0 || body[..position].ends_with(CRLF);
        if !line_start {
            continue;
        }

        let rest = &body[position + delimiter.len()..];
        let padding = rest
            .iter()
            .take_while(|b| **b == b' ' || **b == b'\t')
            .count();
        let line_end = rest.is_empty()
            || rest.starts_with(b"--")
            || rest[padding..].starts_with(CRLF)
            || padding == rest.len();
        if line_end {
            positions.push(position);
        }
    }

    positions
}

fn skip_line_end(body: &[u8], mut offset: usize) -> usize {
    while offset < body.len() && (body[offset] == b' ' || body[offset] == b'\t') {
        offset += 1;
    }
    if body[offset..].starts_with(CRLF) {
        offset += CRLF.len();
    }
    offset
}

fn trim_trailing_crlf(body: &[u8], end: usize) -> usize {
    if body[..end].ends_with(CRLF) {
        end - CRLF.len()
    } else {
        end
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}
