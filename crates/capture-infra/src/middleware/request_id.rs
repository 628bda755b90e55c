use axum::http::HeaderValue;
use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Longest client-supplied request ID that is reused as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request ID stored in request extensions, read by the upload span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reuse the caller's ID when it is short printable ASCII, otherwise mint one.
fn incoming_request_id(request: &Request) -> Option<String> {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .filter(|id| id.bytes().all(|b| b.is_ascii_graphic()))
        .map(str::to_string)
}

/// Tags every request with an ID and echoes it on the response, so an
/// uploader's failure can be matched to the relay's log lines.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id =
        incoming_request_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(id: &str) -> Request {
        axum::http::Request::builder()
            .header(REQUEST_ID_HEADER, id)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_incoming_id_is_reused() {
        assert_eq!(
            incoming_request_id(&request_with("req-123")).as_deref(),
            Some("req-123")
        );
    }

    #[test]
    fn test_unusable_ids_are_replaced() {
        assert!(incoming_request_id(&request_with("has space")).is_none());
        assert!(incoming_request_id(&request_with(&"a".repeat(129))).is_none());
        assert!(incoming_request_id(&Request::new(Body::empty())).is_none());
    }
}
