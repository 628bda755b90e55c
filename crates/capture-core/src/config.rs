//! Configuration module
//!
//! Settings for the upload endpoint, the token store and the forwarder, read
//! from the environment (and an optional `.env` file).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 4000;
const MAX_UPLOAD_SIZE_MB: usize = 25;
const FORWARD_TIMEOUT_SECONDS: u64 = 30;
const UPLOAD_TOKEN_TTL_SECONDS: u64 = 600;
const UPLOAD_TOKEN_SWEEP_INTERVAL_SECS: u64 = 60;
const MAX_PENDING_UPLOADS: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub max_upload_size_bytes: usize,
    pub forward_timeout_seconds: u64,
    /// 0 disables expiry.
    pub upload_token_ttl_seconds: u64,
    /// 0 disables the background sweep.
    pub upload_token_sweep_interval_secs: u64,
    pub max_pending_uploads: usize,
    /// Upload URL handed to capture clients along with their token.
    pub public_upload_url: String,
    pub capture_save_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            forward_timeout_seconds: FORWARD_TIMEOUT_SECONDS,
            upload_token_ttl_seconds: UPLOAD_TOKEN_TTL_SECONDS,
            upload_token_sweep_interval_secs: UPLOAD_TOKEN_SWEEP_INTERVAL_SECS,
            max_pending_uploads: MAX_PENDING_UPLOADS,
            public_upload_url: format!("http://localhost:{}/image", DEFAULT_PORT),
            capture_save_dir: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_env(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match env::var("PORT") {
            Ok(port) => port
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("PORT must be a valid port number: {}", e))?,
            Err(_) => DEFAULT_PORT,
        };

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);
        let max_upload_size_bytes = upload_size_bytes(max_upload_size_mb)?;

        let public_upload_url = env::var("PUBLIC_UPLOAD_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}/image", server_port));

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            server_port,
            environment,
            cors_origins,
            max_upload_size_bytes,
            forward_timeout_seconds: env::var("FORWARD_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| FORWARD_TIMEOUT_SECONDS.to_string())
                .parse()
                .unwrap_or(FORWARD_TIMEOUT_SECONDS),
            upload_token_ttl_seconds: env::var("UPLOAD_TOKEN_TTL_SECONDS")
                .unwrap_or_else(|_| UPLOAD_TOKEN_TTL_SECONDS.to_string())
                .parse()
                .unwrap_or(UPLOAD_TOKEN_TTL_SECONDS),
            upload_token_sweep_interval_secs: env::var("UPLOAD_TOKEN_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| UPLOAD_TOKEN_SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(UPLOAD_TOKEN_SWEEP_INTERVAL_SECS),
            max_pending_uploads: env::var("MAX_PENDING_UPLOADS")
                .unwrap_or_else(|_| MAX_PENDING_UPLOADS.to_string())
                .parse()
                .unwrap_or(MAX_PENDING_UPLOADS),
            public_upload_url,
            capture_save_dir: env::var("CAPTURE_SAVE_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            log_format,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.forward_timeout_seconds == 0 {
            return Err(anyhow::anyhow!(
                "FORWARD_TIMEOUT_SECONDS must be greater than 0"
            ));
        }

        if self.max_pending_uploads == 0 {
            return Err(anyhow::anyhow!("MAX_PENDING_UPLOADS must be greater than 0"));
        }

        if !self.public_upload_url.starts_with("http://")
            && !self.public_upload_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "PUBLIC_UPLOAD_URL must be an http(s) URL, got '{}'",
                self.public_upload_url
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.environment)
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_secs(self.forward_timeout_seconds)
    }

    pub fn upload_token_ttl(&self) -> Option<Duration> {
        (self.upload_token_ttl_seconds > 0)
            .then(|| Duration::from_secs(self.upload_token_ttl_seconds))
    }

    pub fn upload_token_sweep_interval(&self) -> Option<Duration> {
        (self.upload_token_sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.upload_token_sweep_interval_secs))
    }
}

fn upload_size_bytes(megabytes: usize) -> Result<usize, anyhow::Error> {
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_UPLOAD_SIZE_MB is too large: {}", megabytes))
}

fn is_production_env(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}
