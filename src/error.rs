use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Everything that can make an analysis fail. Callers show the user a single
/// generic notice for all of these; the variant detail is for logs.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("request to {endpoint} failed: {source}")]
    Transport { endpoint: String, source: BoxError },

    #[error("{endpoint} responded with HTTP {status}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        body_excerpt: String,
    },

    #[error("malformed payload ({shape}): {reason}")]
    MalformedPayload { shape: String, reason: String },
}

impl AnalysisError {
    pub fn transport(endpoint: impl Into<String>, source: impl Into<BoxError>) -> Self {
        AnalysisError::Transport {
            endpoint: endpoint.into(),
            source: source.into(),
        }
    }

    pub fn http_status(endpoint: impl Into<String>, status: u16, body: &str) -> Self {
        AnalysisError::HttpStatus {
            endpoint: endpoint.into(),
            status,
            body_excerpt: excerpt(body, 200),
        }
    }

    pub fn malformed(shape: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::MalformedPayload {
            shape: shape.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Transport { .. } => ErrorKind::Transport,
            AnalysisError::HttpStatus { .. } => ErrorKind::HttpStatus,
            AnalysisError::MalformedPayload { .. } => ErrorKind::MalformedPayload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    HttpStatus,
    MalformedPayload,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::HttpStatus => write!(f, "http_status"),
            ErrorKind::MalformedPayload => write!(f, "malformed_payload"),
        }
    }
}

fn excerpt(body: &str, limit: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
