use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML decode error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

impl BotError {
    /// 行程退出碼：缺少必要設定為 2，其餘未處理的錯誤為 1
    pub fn exit_code(&self) -> i32 {
        match self {
            BotError::MissingConfigError { .. } => 2,
            _ => 1,
        }
    }

    /// 沒有取得任何 HTTP 回應的錯誤（DNS、連線拒絕、TLS、逾時）
    pub fn is_network(&self) -> bool {
        match self {
            BotError::NetworkError(e) => !e.is_builder() && !e.is_status(),
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BotError::NetworkError(_) => "Could not reach the remote service".to_string(),
            BotError::HttpStatusError { status, .. } => {
                format!("Remote service answered with HTTP {}", status)
            }
            BotError::MissingConfigError { field } => {
                format!("{} is not set, nothing will be sent", field)
            }
            BotError::InvalidConfigValueError { field, .. } => {
                format!("{} has an invalid value", field)
            }
            BotError::TomlError(_) => "Destination table could not be parsed".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BotError::NetworkError(_) => {
                "Check connectivity; set HTTPS_PROXY if the host only allows proxied traffic"
            }
            BotError::HttpStatusError { .. } => "Retry later; the remote service may be throttling",
            BotError::MissingConfigError { .. } => {
                "Export BOT_TOKEN (or pass --bot-token) with the bot's API token"
            }
            BotError::InvalidConfigValueError { .. } | BotError::ConfigError { .. } => {
                "Fix the value and run again; see --help for accepted formats"
            }
            BotError::TomlError(_) => {
                "Each [[destinations]] entry needs id, latitude, longitude, radius and label"
            }
            BotError::IoError(_) => "Check that the file exists and is readable",
            BotError::UrlError(_) => "Check the configured API endpoints",
            BotError::SerializationError(_) | BotError::ProcessingError { .. } => {
                "Re-run with --verbose for details"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
