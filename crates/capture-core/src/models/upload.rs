use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{DEFAULT_ENCODING, DEFAULT_FORM_FIELD};
use crate::hooks::LocalHandler;

/// Wire shape the capture requester expects the payload in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    /// Raw bytes, sent on as a multipart file part.
    Raw,
    /// A `data:` URL string.
    #[default]
    Base64,
}

impl Display for Representation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Representation::Raw => write!(f, "raw"),
            Representation::Base64 => write!(f, "base64"),
        }
    }
}

impl FromStr for Representation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" | "blob" => Ok(Representation::Raw),
            "base64" => Ok(Representation::Base64),
            _ => Err(anyhow::anyhow!("Invalid representation: {}", s)),
        }
    }
}

/// Where and how a decoded payload is re-sent to a third-party service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub form_field: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub quality: Option<f32>,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_form_field(mut self, field: impl Into<String>) -> Self {
        self.form_field = Some(field.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Multipart field name, `file` when unset or blank.
    pub fn field_name(&self) -> &str {
        self.form_field
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(DEFAULT_FORM_FIELD)
    }

    pub fn encoding_or_default(&self) -> &str {
        self.encoding
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(DEFAULT_ENCODING)
    }
}

/// Who receives the result of a capture once its upload arrives.
#[derive(Clone)]
pub enum DispatchTarget {
    /// A handler living in this process.
    Local(Arc<dyn LocalHandler>),
    /// A network participant that asked for the token itself.
    Remote {
        participant_id: String,
        correlation_id: String,
    },
}

impl Debug for DispatchTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DispatchTarget::Local(_) => f.write_str("Local(<handler>)"),
            DispatchTarget::Remote {
                participant_id,
                correlation_id,
            } => f
                .debug_struct("Remote")
                .field("participant_id", participant_id)
                .field("correlation_id", correlation_id)
                .finish(),
        }
    }
}

impl DispatchTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchTarget::Local(_) => "local",
            DispatchTarget::Remote { .. } => "remote",
        }
    }
}

/// A capture waiting for its upload. Consumed exactly once.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub dispatch_target: DispatchTarget,
    pub is_forwarded: bool,
    pub remote_config: Option<RemoteConfig>,
    pub representation: Representation,
    /// Encoding the capture client was asked for, used when there is no remote config.
    pub encoding: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingUpload {
    /// Result is delivered to `handler` without forwarding.
    pub fn local(handler: Arc<dyn LocalHandler>, representation: Representation) -> Self {
        Self {
            dispatch_target: DispatchTarget::Local(handler),
            is_forwarded: false,
            remote_config: None,
            representation,
            encoding: None,
            created_at: Utc::now(),
        }
    }

    /// Payload is re-sent to `remote_config.url`; the upstream response goes to `target`.
    pub fn forwarded(
        target: DispatchTarget,
        remote_config: RemoteConfig,
        representation: Representation,
    ) -> Self {
        Self {
            dispatch_target: target,
            is_forwarded: true,
            remote_config: Some(remote_config),
            representation,
            encoding: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Declared image encoding: remote config first, then the requested one, then `webp`.
    pub fn encoding_hint(&self) -> &str {
        self.remote_config
            .as_ref()
            .and_then(|c| c.encoding.as_deref())
            .or(self.encoding.as_deref())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(DEFAULT_ENCODING)
    }

    /// Upload file field name expected from the capture client.
    ///
    /// Only clients sent a `CaptureInstruction` learn the remote field name.
    /// Remote participants always upload under `file`; their `form_field` only
    /// names the outbound part.
    pub fn form_field(&self) -> &str {
        match (&self.dispatch_target, &self.remote_config) {
            (DispatchTarget::Local(_), Some(config)) => config.field_name(),
            _ => DEFAULT_FORM_FIELD,
        }
    }

    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.created_at > ttl,
            Err(_) => false,
        }
    }
}
