//! Capture Processing Library
//!
//! Pure, synchronous transformations on upload bodies: the binary-safe
//! multipart decoder and the payload codec that turns decoded file bytes into
//! the representation a capture requester asked for.

pub mod codec;
pub mod multipart;

pub use codec::{
    decode_data_url, encode, file_extension, inline_payload, mime_for_encoding, CodecError,
};
pub use multipart::{
    boundary_from_content_type, decode, is_multipart, DecodedField, DecodedForm, FieldValue,
    MultipartError,
};
