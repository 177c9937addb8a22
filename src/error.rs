use std::path::PathBuf;

/// Errors reading or writing the persisted alarm and credential files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("couldn't access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("alarm [{name}] has a bad `{field}` value: {reason}")]
    Section {
        name: String,
        field: &'static str,
        reason: String,
    },

    #[error("alarm {0} not found")]
    AlarmNotFound(String),

    #[error("couldn't find a config directory for this user")]
    NoConfigDir,

    #[error("config task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors from one outbound trigger call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("trigger API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl GatewayError {
    /// Sort a transport error into a timeout or a plain HTTP failure.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

/// Errors in alarm fields submitted by the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("alarm name can't be empty")]
    EmptyName,

    #[error("time {0:?} is not in HH:MM format")]
    Time(String),

    #[error("intensity {0:?} must be a whole number from 0 to 100")]
    Intensity(String),

    #[error("duration {0:?} must be a non-negative number of seconds")]
    Duration(String),

    #[error("{0} can't be empty")]
    Missing(&'static str),
}
