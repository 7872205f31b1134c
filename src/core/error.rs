use std::fmt;
use thiserror::Error;

/// Which backend operation a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Extract,
    Generate,
    Voices,
    Synthesize,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Extract => "extraction",
            RequestKind::Generate => "script generation",
            RequestKind::Voices => "voice list",
            RequestKind::Synthesize => "synthesis",
        };
        f.write_str(name)
    }
}

/// Failure of a single user action. Other wizard state is never touched.
#[derive(Debug, Error)]
pub enum WizardError {
    /// Rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// Non-2xx status or network failure.
    #[error("{}", transport_message(.status, .message))]
    Transport { status: Option<u16>, message: String },

    /// The backend answered, but the payload was unusable.
    #[error("{0}")]
    Payload(String),

    #[error("a {0} request is already running")]
    Busy(RequestKind),
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) if message.is_empty() => format!("HTTP {}", code),
        Some(code) => format!("HTTP {}: {}", code, message),
        None => format!("Network error: {}", message),
    }
}

impl WizardError {
    pub fn validation(msg: impl Into<String>) -> Self {
        WizardError::Validation(msg.into())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            WizardError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}
