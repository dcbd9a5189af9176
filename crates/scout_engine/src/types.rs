use std::fmt;

/// A listing or form page that came back with status 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    /// The requested URL; base for resolving relative links.
    pub url: String,
    pub content_type: Option<String>,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Redirected to the SSO login; the session cookie has expired.
    AuthExpired { location: String },
    /// Redirected somewhere other than the SSO login.
    Redirected { status: u16, location: String },
    HttpStatus(u16),
    InvalidUrl,
    InvalidHeader { name: &'static str },
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl FailureKind {
    /// Whether this failure means the session is unusable and scheduled
    /// polling should be suspended until credentials are refreshed.
    pub fn suspends_polling(&self) -> bool {
        match self {
            FailureKind::AuthExpired { .. }
            | FailureKind::Redirected { .. }
            | FailureKind::HttpStatus(_)
            | FailureKind::InvalidUrl
            | FailureKind::InvalidHeader { .. }
            | FailureKind::Timeout
            | FailureKind::TooLarge { .. }
            | FailureKind::Network => true,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, FailureKind::AuthExpired { .. })
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::AuthExpired { location } => {
                write!(f, "authentication required (redirected to {location})")
            }
            FailureKind::Redirected { status, location } => {
                write!(f, "unexpected redirect {status} to {location}")
            }
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidHeader { name } => write!(f, "invalid value for header {name}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
