use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    /// Whether the next poll cycle can reasonably succeed without user action.
    fn is_recoverable(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Feed(e) => {
                error!("Feed error details: {:?}", e);
            }
            CoreError::TorrentClient(e) => {
                error!("Torrent client error details: {:?}", e);
            }
            CoreError::Storage(e) => {
                error!("Storage error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_recoverable(&self) -> bool {
        match self {
            CoreError::Feed(e) => e.is_recoverable(),
            CoreError::TorrentClient(e) => e.is_recoverable(),
            CoreError::Storage(e) => e.is_recoverable(),
            CoreError::Config(e) => e.is_recoverable(),
            CoreError::Network(_) => true,
            CoreError::Io(_) => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Feed(e) => e.user_friendly_message(),
            CoreError::TorrentClient(e) => e.user_friendly_message(),
            CoreError::Storage(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your connection.".to_string()
            }
            CoreError::Io(_) => "A file operation failed. Please check the log file.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Feed(_) => "FEED".to_string(),
            CoreError::TorrentClient(_) => "TORRENT_CLIENT".to_string(),
            CoreError::Storage(_) => "STORAGE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
        }
    }
}

impl ErrorExt for FeedError {
    fn log_error(&self) -> &Self {
        error!("FeedError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("FeedError (warning): {}", self);
        self
    }

    fn is_recoverable(&self) -> bool {
        // A broken feed is skipped for this cycle and fetched again on the next one.
        true
    }

    fn user_friendly_message(&self) -> String {
        match self {
            FeedError::HttpStatus { url, status } => {
                format!("Feed '{}' returned HTTP {}. It will be retried later.", url, status)
            }
            FeedError::Unreachable { url, .. } => {
                format!("Feed '{}' could not be reached. Please check the URL.", url)
            }
            FeedError::Timeout { url } => format!("Feed '{}' took too long to respond.", url),
            FeedError::Malformed { url, .. } => {
                format!("Feed '{}' is not a valid RSS or Atom document.", url)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            FeedError::HttpStatus { .. } => "FEED_HTTP_STATUS".to_string(),
            FeedError::Unreachable { .. } => "FEED_UNREACHABLE".to_string(),
            FeedError::Timeout { .. } => "FEED_TIMEOUT".to_string(),
            FeedError::Malformed { .. } => "FEED_MALFORMED".to_string(),
        }
    }
}

impl ErrorExt for TorrentClientError {
    fn log_error(&self) -> &Self {
        error!("TorrentClientError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("TorrentClientError (warning): {}", self);
        self
    }

    fn is_recoverable(&self) -> bool {
        match self {
            TorrentClientError::AuthenticationFailed => false,
            TorrentClientError::ServerError { status_code } => *status_code >= 500,
            _ => true,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            TorrentClientError::Connectivity { endpoint, .. } => format!(
                "Could not connect to Transmission at {}. Please check that the daemon is running and the host and port are correct.",
                endpoint
            ),
            TorrentClientError::AuthenticationFailed => {
                "Transmission rejected the username or password. Please check your credentials."
                    .to_string()
            }
            TorrentClientError::SessionHandshakeFailed { .. } => {
                "Transmission did not accept the RPC session. Please try again.".to_string()
            }
            TorrentClientError::AddTorrentFailed { link, .. } => {
                format!("Transmission could not add '{}'. It will be retried later.", link)
            }
            TorrentClientError::TorrentNotFound { id } => {
                format!("Torrent {} is no longer known to Transmission.", id)
            }
            _ => "Transmission returned an unexpected response. Please try again later."
                .to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            TorrentClientError::Connectivity { .. } => "CLIENT_CONNECTIVITY".to_string(),
            TorrentClientError::AuthenticationFailed => "CLIENT_AUTH_FAILED".to_string(),
            TorrentClientError::SessionHandshakeFailed { .. } => {
                "CLIENT_SESSION_HANDSHAKE".to_string()
            }
            TorrentClientError::RpcFailed { .. } => "CLIENT_RPC_FAILED".to_string(),
            TorrentClientError::AddTorrentFailed { .. } => "CLIENT_ADD_TORRENT".to_string(),
            TorrentClientError::TorrentNotFound { .. } => "CLIENT_TORRENT_NOT_FOUND".to_string(),
            TorrentClientError::InvalidResponse { .. } => "CLIENT_INVALID_RESPONSE".to_string(),
            TorrentClientError::ServerError { .. } => "CLIENT_SERVER_ERROR".to_string(),
        }
    }
}

impl ErrorExt for StorageError {
    fn log_error(&self) -> &Self {
        error!("StorageError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("StorageError (warning): {}", self);
        self
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StorageError::ReadFailed { path, .. } => {
                format!("Could not read '{}'. Please check file permissions.", path)
            }
            StorageError::WriteFailed { path, .. } => format!(
                "Could not write '{}'. Please check file permissions and free disk space.",
                path
            ),
        }
    }

    fn error_code(&self) -> String {
        match self {
            StorageError::ReadFailed { .. } => "STORAGE_READ_FAILED".to_string(),
            StorageError::WriteFailed { .. } => "STORAGE_WRITE_FAILED".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_recoverable(&self) -> bool {
        false // Config errors need the user to fix the file
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is invalid: {}.", reason)
            }
            ConfigError::PromptAborted { .. } => {
                "Setup was not completed. Please run again and answer every question.".to_string()
            }
            ConfigError::Parse(_) => {
                "Settings file is not valid TOML. Please check the syntax.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::PromptAborted { .. } => "CONFIG_PROMPT_ABORTED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs a fatal error together with its code and the message shown to the user.
#[derive(Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        info!("User message: {}", error.user_friendly_message());
    }
}
