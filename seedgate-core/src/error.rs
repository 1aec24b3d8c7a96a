use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Torrent client error: {0}")]
    TorrentClient(#[from] TorrentClientError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Error, Debug, Clone)]
pub enum FeedError {
    #[error("Feed {url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Feed {url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Feed {url} timed out")]
    Timeout { url: String },

    #[error("Feed {url} could not be parsed: {details}")]
    Malformed { url: String, details: String },
}

#[derive(Error, Debug, Clone)]
pub enum TorrentClientError {
    #[error("Cannot reach torrent client at {endpoint}: {reason}")]
    Connectivity { endpoint: String, reason: String },

    #[error("Torrent client rejected the credentials")]
    AuthenticationFailed,

    #[error("Torrent client session handshake failed: {reason}")]
    SessionHandshakeFailed { reason: String },

    #[error("RPC method {method} failed: {result}")]
    RpcFailed { method: String, result: String },

    #[error("Failed to add torrent {link}: {reason}")]
    AddTorrentFailed { link: String, reason: String },

    #[error("Torrent {id} not found in client")]
    TorrentNotFound { id: i64 },

    #[error("Invalid RPC response: {details}")]
    InvalidResponse { details: String },

    #[error("Torrent client server error: {status_code}")]
    ServerError { status_code: u16 },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Interactive setup aborted: {reason}")]
    PromptAborted { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
