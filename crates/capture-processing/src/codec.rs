//! Payload codec: raw bytes or `data:` URLs, with the MIME type chosen from the
//! declared image encoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use capture_core::models::{OutboundPayload, Representation};
use capture_core::AppError;
use serde::Deserialize;

const DEFAULT_MIME: &str = "image/webp";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Not a base64 data URL")]
    NotDataUrl,

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("Upload body is not valid UTF-8")]
    NotUtf8,

    #[error("Upload body is empty")]
    Empty,
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Empty => AppError::NoFileProvided,
            other => AppError::InvalidBody(other.to_string()),
        }
    }
}

/// MIME type for an encoding hint. Unknown or missing hints map to `image/webp`.
pub fn mime_for_encoding(encoding: Option<&str>) -> &'static str {
    match encoding.map(|e| e.trim().to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => DEFAULT_MIME,
    }
}

/// File extension matching `mime_for_encoding`.
pub fn file_extension(encoding: Option<&str>) -> &'static str {
    extension_for_mime(mime_for_encoding(encoding))
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Convert decoded file bytes into the representation the requester expects.
pub fn encode(
    bytes: Bytes,
    representation: Representation,
    encoding_hint: Option<&str>,
) -> OutboundPayload {
    match representation {
        Representation::Raw => OutboundPayload::Binary(bytes),
        Representation::Base64 => OutboundPayload::DataUrl(format!(
            "data:{};base64,{}",
            mime_for_encoding(encoding_hint),
            STANDARD.encode(&bytes)
        )),
    }
}

/// Split a `data:{mime};base64,{payload}` URL into its MIME type and bytes.
pub fn decode_data_url(data_url: &str) -> Result<(String, Bytes), CodecError> {
    let rest = data_url.strip_prefix("data:").ok_or(CodecError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(CodecError::NotDataUrl)?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or(CodecError::NotDataUrl)?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;

    Ok((mime.to_string(), Bytes::from(bytes)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineUpload {
    image_data: String,
}

/// Payload string of a non-multipart upload: the `imageData` member of a JSON
/// body, otherwise the whole body as text.
pub fn inline_payload(body: &[u8]) -> Result<String, CodecError> {
    if let Ok(upload) = serde_json::from_slice::<InlineUpload>(body) {
        return non_empty(upload.image_data);
    }

    let text = std::str::from_utf8(body).map_err(|_| CodecError::NotUtf8)?;
    non_empty(text.trim().to_string())
}

fn non_empty(payload: String) -> Result<String, CodecError> {
    if payload.trim().is_empty() {
        Err(CodecError::Empty)
    } else {
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

    #[test]
    fn test_mime_selection() {
        assert_eq!(mime_for_encoding(Some("png")), "image/png");
        assert_eq!(mime_for_encoding(Some("JPG")), "image/jpeg");
        assert_eq!(mime_for_encoding(Some("jpeg")), "image/jpeg");
        assert_eq!(mime_for_encoding(Some("webp")), "image/webp");
        assert_eq!(mime_for_encoding(Some("gif")), "image/webp");
        assert_eq!(mime_for_encoding(None), "image/webp");
        assert_eq!(file_extension(Some("jpeg")), "jpg");
    }

    #[test]
    fn test_raw_is_passthrough() {
        let bytes = Bytes::from_static(&PNG_MAGIC);
        assert_eq!(
            encode(bytes.clone(), Representation::Raw, Some("png")),
            OutboundPayload::Binary(bytes)
        );
    }

    #[test]
    fn test_base64_data_url_round_trip() {
        let payload = encode(Bytes::from_static(&PNG_MAGIC), Representation::Base64, None);
        let OutboundPayload::DataUrl(url) = payload else {
            panic!("expected a data URL");
        };
        assert_eq!(url, "data:image/webp;base64,iVBORw==");

        let (mime, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime, "image/webp");
        assert_eq!(bytes.as_ref(), &PNG_MAGIC);
    }

    #[test]
    fn test_empty_input_is_valid() {
        let payload = encode(Bytes::new(), Representation::Base64, Some("png"));
        assert_eq!(payload, OutboundPayload::DataUrl("data:image/png;base64,".to_string()));

        let (_, bytes) = decode_data_url("data:image/png;base64,").unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_decode_data_url_errors() {
        assert_eq!(decode_data_url("iVBORw=="), Err(CodecError::NotDataUrl));
        assert_eq!(decode_data_url("data:image/png,abc"), Err(CodecError::NotDataUrl));
        assert!(matches!(
            decode_data_url("data:image/png;base64,***"),
            Err(CodecError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_inline_payload() {
        assert_eq!(
            inline_payload(br#"{"imageData":"data:image/png;base64,AA=="}"#).unwrap(),
            "data:image/png;base64,AA=="
        );
        assert_eq!(
            inline_payload(b"  data:image/jpeg;base64,AA==\n").unwrap(),
            "data:image/jpeg;base64,AA=="
        );
        assert_eq!(inline_payload(b"   "), Err(CodecError::Empty));
        assert_eq!(inline_payload(&[0xFF, 0xFE]), Err(CodecError::NotUtf8));
        assert!(matches!(
            AppError::from(CodecError::Empty),
            AppError::NoFileProvided
        ));
    }
}
