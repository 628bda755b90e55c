//! Test fixtures: capture bytes and hand-built multipart bodies.

pub const BOUNDARY: &str = "XYZ123";

/// PNG magic number, enough for a capture payload.
pub fn png_magic() -> Vec<u8> {
    vec![0x89, 0x50, 0x4E, 0x47]
}

/// Bytes that look like trouble for a multipart parser: CRLFs, a boundary
/// lookalike mid-line, a boundary-prefixed line and invalid UTF-8.
pub fn tricky_payload() -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0xFF, 0xFE];
    bytes.extend_from_slice(b"abc--XYZ123\r\n--XYZ123abc\r\n\r\n");
    bytes.extend_from_slice(&[0x00, 0xC3, 0x28, 0x0D]);
    bytes
}

pub fn multipart_content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={}", boundary)
}

/// A form with one text field and one file part named `field`.
pub fn multipart_body(boundary: &str, field: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\n");
    body.extend_from_slice(b"hello\r\n");
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"screenshot.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
