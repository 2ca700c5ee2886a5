use thiserror::Error;

/// Canonical result for feedq.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Transport failure or a non-success HTTP status. `status` is `None`
    /// when no response was received at all.
    #[error("fetch failed for '{path}' at offset {offset}{}: {detail}", status_suffix(.status))]
    FetchFailed {
        path: String,
        offset: usize,
        status: Option<u16>,
        detail: String,
    },

    #[error("malformed envelope from '{path}' at offset {offset}: {reason}")]
    MalformedEnvelope {
        path: String,
        offset: usize,
        reason: String,
    },

    #[error("sheet '{sheet}' not found in '{path}'")]
    SheetNotFound { path: String, sheet: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl Error {
    pub fn fetch_failed(
        path: impl Into<String>,
        offset: usize,
        status: Option<u16>,
        detail: impl Into<String>,
    ) -> Self {
        Error::FetchFailed {
            path: path.into(),
            offset,
            status,
            detail: detail.into(),
        }
    }

    pub fn malformed(path: impl Into<String>, offset: usize, reason: impl Into<String>) -> Self {
        Error::MalformedEnvelope {
            path: path.into(),
            offset,
            reason: reason.into(),
        }
    }

    /// HTTP status carried by a `FetchFailed`, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::FetchFailed { status, .. } => *status,
            _ => None,
        }
    }
}
