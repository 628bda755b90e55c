use capture_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("No remote URL provided")]
    NoRemoteUrl,

    #[error("No remote config provided")]
    NoRemoteConfig,

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Invalid content type '{0}'")]
    InvalidContentType(String),

    #[error("Failed to upload file to {url}. Status: {status}. Response: {body}")]
    UpstreamHttp {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Response from {url} is not valid JSON: {message}")]
    UpstreamParse { url: String, message: String },

    #[error("Failed to reach {url}: {message}")]
    Transport { url: String, message: String },
}

impl From<ForwardError> for AppError {
    fn from(err: ForwardError) -> Self {
        let message = err.to_string();
        match err {
            ForwardError::NoRemoteUrl => AppError::NoRemoteUrl,
            ForwardError::NoRemoteConfig => AppError::NoRemoteConfig,
            ForwardError::InvalidHeader { .. } | ForwardError::InvalidContentType(_) => {
                AppError::InvalidRemoteConfig(message)
            }
            ForwardError::UpstreamHttp { url, status, body } => {
                AppError::UpstreamHttpError { url, status, body }
            }
            ForwardError::UpstreamParse { .. } => AppError::UpstreamParseError(message),
            ForwardError::Transport { url, message } => {
                AppError::UpstreamTransport { url, message }
            }
        }
    }
}
