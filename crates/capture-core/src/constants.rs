//! Wire-level constants shared by the endpoint, the forwarder and the broker.

/// Request header carrying the one-time upload token.
pub const TOKEN_HEADER: &str = "X-ScreenCapture-Token";

/// Path of the single upload endpoint.
pub const UPLOAD_PATH: &str = "/image";

/// Multipart field that carries the file when none is configured.
pub const DEFAULT_FORM_FIELD: &str = "file";

/// Encoding assumed when the capture request does not declare one.
pub const DEFAULT_ENCODING: &str = "webp";

/// Filename stem used for forwarded files when the caller supplies none.
pub const DEFAULT_FILENAME: &str = "screenshot";

/// Number of random bytes behind every upload token (hex encoded on the wire).
pub const TOKEN_BYTES: usize = 24;

/// Characters of a token that may appear in logs.
pub const TOKEN_LOG_PREFIX_LEN: usize = 6;

/// Client-facing message for errors that carry no safe detail.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";
