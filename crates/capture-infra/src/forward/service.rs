use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

use capture_core::constants::DEFAULT_FILENAME;
use capture_core::models::{OutboundPayload, RemoteConfig, Representation};
use capture_processing::mime_for_encoding;

use super::error::ForwardError;

const RAW_BODY_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Re-sends decoded uploads to third-party services.
#[derive(Clone)]
pub struct RemoteForwarder {
    http_client: Client,
}

impl RemoteForwarder {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to create HTTP client for remote uploads")?;

        Ok(Self { http_client })
    }

    /// Send `payload` to `url` and return the service's JSON response.
    ///
    /// `Raw` payloads go out as a multipart file part, `Base64` payloads as the
    /// whole request body. The response is passed through uninterpreted.
    #[tracing::instrument(skip(self, config, payload))]
    pub async fn forward(
        &self,
        url: &str,
        config: Option<&RemoteConfig>,
        payload: OutboundPayload,
        representation: Representation,
    ) -> Result<serde_json::Value, ForwardError> {
        if url.trim().is_empty() {
            return Err(ForwardError::NoRemoteUrl);
        }
        let config = config.ok_or(ForwardError::NoRemoteConfig)?;

        let request = match representation {
            Representation::Raw => {
                let bytes = match payload {
                    OutboundPayload::Binary(bytes) => bytes,
                    OutboundPayload::DataUrl(text) => Bytes::from(text),
                };
                let headers = caller_headers(config, false)?;
                self.http_client
                    .post(url)
                    .headers(headers)
                    .multipart(multipart_form(config, bytes)?)
            }
            Representation::Base64 => {
                let mut headers = caller_headers(config, true)?;
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(RAW_BODY_CONTENT_TYPE));
                }
                self.http_client
                    .post(url)
                    .headers(headers)
                    .body(payload.to_text())
            }
        };

        let response = request.send().await.map_err(|e| ForwardError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("Failed to read response body"));

        // Consider 2xx as success
        if !(200..300).contains(&status) {
            tracing::warn!(url = %url, status_code = status, "Remote upload rejected");
            return Err(ForwardError::UpstreamHttp {
                url: url.to_string(),
                status,
                body,
            });
        }

        let value = serde_json::from_str(&body).map_err(|e| ForwardError::UpstreamParse {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        tracing::info!(url = %url, status_code = status, "Remote upload succeeded");
        Ok(value)
    }
}

/// Filename of the forwarded file part. A supplied name without an extension
/// gets the declared encoding appended.
pub fn upload_filename(config: &RemoteConfig) -> String {
    let encoding = config.encoding_or_default();
    match config
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        Some(name) if Path::new(name).extension().is_some() => name.to_string(),
        Some(name) => format!("{}.{}", name, encoding),
        None => format!("{}.{}", DEFAULT_FILENAME, encoding),
    }
}

fn multipart_form(config: &RemoteConfig, bytes: Bytes) -> Result<Form, ForwardError> {
    let mime = mime_for_encoding(config.encoding.as_deref());
    let part = Part::bytes(bytes.to_vec())
        .file_name(upload_filename(config))
        .mime_str(mime)
        .map_err(|_| ForwardError::InvalidContentType(mime.to_string()))?;

    let mut form = Form::new().part(config.field_name().to_string(), part);

    // Some upload services read the name from a separate text field.
    if let Some(filename) = config.filename.as_deref().filter(|f| !f.trim().is_empty()) {
        form = form.text("filename", filename.to_string());
    }

    Ok(form)
}

/// Caller-supplied headers. Multipart bodies keep their own `Content-Type`.
fn caller_headers(config: &RemoteConfig, keep_content_type: bool) -> Result<HeaderMap, ForwardError> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ForwardError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        if header_name == CONTENT_TYPE && !keep_content_type {
            continue;
        }
        let header_value = HeaderValue::from_str(value).map_err(|e| ForwardError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}
