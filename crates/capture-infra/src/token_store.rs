use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use capture_core::constants::{TOKEN_BYTES, TOKEN_LOG_PREFIX_LEN};
use capture_core::models::PendingUpload;
use capture_core::{AppError, Config};

/// Generate an unguessable upload token (hex of `TOKEN_BYTES` random bytes).
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let random_bytes: Vec<u8> = (0..TOKEN_BYTES).map(|_| rng.random()).collect();
    hex::encode(random_bytes)
}

/// Loggable prefix of a token.
pub fn token_prefix(token: &str) -> &str {
    token.get(..TOKEN_LOG_PREFIX_LEN).unwrap_or(token)
}

/// One-time upload tokens, each bound to the capture it was issued for.
///
/// Cloning yields another handle to the same map. `issue` and `consume` take
/// the same lock, so a token can be consumed at most once.
#[derive(Clone)]
pub struct TokenStore {
    entries: Arc<Mutex<HashMap<String, PendingUpload>>>,
    ttl: Option<Duration>,
    max_pending: usize,
}

impl TokenStore {
    /// `ttl` of `None` keeps tokens until they are consumed.
    pub fn new(ttl: Option<Duration>, max_pending: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_pending,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.upload_token_ttl(), config.max_pending_uploads)
    }

    /// Store `pending` under a fresh token and return the token.
    #[tracing::instrument(
        skip(self, pending),
        fields(dispatch_target = pending.dispatch_target.kind(), forwarded = pending.is_forwarded)
    )]
    pub async fn issue(&self, pending: PendingUpload) -> Result<String, AppError> {
        if pending.is_forwarded {
            match &pending.remote_config {
                None => return Err(AppError::NoRemoteConfig),
                Some(config) if config.url.trim().is_empty() => return Err(AppError::NoRemoteUrl),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.lock().await;

        if entries.len() >= self.max_pending {
            let evicted = self.evict_expired(&mut entries);
            if evicted > 0 {
                tracing::debug!(evicted, "Evicted expired upload tokens before issuing");
            }
        }
        if entries.len() >= self.max_pending {
            tracing::warn!(
                pending = entries.len(),
                limit = self.max_pending,
                "Pending upload limit reached"
            );
            return Err(AppError::PendingLimitReached {
                limit: self.max_pending,
            });
        }

        let token = loop {
            let candidate = generate_token();
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };
        entries.insert(token.clone(), pending);

        tracing::debug!(
            token_prefix = token_prefix(&token),
            pending = entries.len(),
            "Upload token issued"
        );

        Ok(token)
    }

    /// Remove and return the upload bound to `token`.
    ///
    /// Consumed, expired and never-issued tokens all fail with `UnknownToken`.
    pub async fn consume(&self, token: &str) -> Result<PendingUpload, AppError> {
        let pending = self
            .entries
            .lock()
            .await
            .remove(token)
            .ok_or(AppError::UnknownToken)?;

        if let Some(ttl) = self.ttl {
            if pending.is_expired(ttl, Utc::now()) {
                tracing::debug!(
                    token_prefix = token_prefix(token),
                    "Upload token expired before use"
                );
                return Err(AppError::UnknownToken);
            }
        }

        tracing::debug!(token_prefix = token_prefix(token), "Upload token consumed");
        Ok(pending)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        self.evict_expired(&mut entries)
    }

    fn evict_expired(&self, entries: &mut HashMap<String, PendingUpload>) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, pending| !pending.is_expired(ttl, now));
        before - entries.len()
    }

    /// Run `sweep_expired` every `interval` until the returned task is aborted.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = store.sweep_expired().await;
                if removed > 0 {
                    tracing::info!(removed, "Swept expired upload tokens");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
