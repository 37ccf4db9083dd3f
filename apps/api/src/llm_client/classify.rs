//! Error classification for LLM failures.
//!
//! Provider errors are inconsistently shaped: sometimes a structured status
//! code, sometimes only a message string. Classification therefore runs an
//! ordered rule table over both, first match wins, and always produces a
//! stable `{kind, status, message}` — it never fails, even for error shapes
//! nobody anticipated.
//!
//! The substring patterns track upstream wording and are best-effort, not a
//! contract. They live in one table so a new pattern is a one-line edit.

use crate::llm_client::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    ServiceUnavailable,
    RateLimited,
    Auth,
    BadRequest,
    Timeout,
    Unknown,
}

impl ErrorKind {
    /// HTTP status this kind maps to in responses.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::Network => 503,
            ErrorKind::ServiceUnavailable => 503,
            ErrorKind::RateLimited => 429,
            ErrorKind::Auth => 401,
            ErrorKind::BadRequest => 400,
            ErrorKind::Timeout => 408,
            ErrorKind::Unknown => 500,
        }
    }

    /// Stable user-facing message for this kind.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::Network => {
                "Network error. Please check your internet connection and try again."
            }
            ErrorKind::ServiceUnavailable => {
                "AI service is temporarily unavailable. Please try again in a few moments."
            }
            ErrorKind::RateLimited => "API rate limit exceeded. Please try again in a minute.",
            ErrorKind::Auth => "Authentication error. Please check your API configuration.",
            ErrorKind::BadRequest => "Invalid request. Please check your input and try again.",
            ErrorKind::Timeout => "Request timed out. Please try again.",
            ErrorKind::Unknown => "Failed to process request. Please try again later.",
        }
    }

    /// Machine-readable code used in HTTP error bodies.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::Auth => "AUTH_ERROR",
            ErrorKind::BadRequest => "INVALID_REQUEST",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Unknown => "LLM_ERROR",
        }
    }

    /// Client faults (bad input, bad credentials) cannot be fixed by
    /// retrying; everything else is worth another attempt.
    pub fn is_client_fault(self) -> bool {
        matches!(self.status(), 400 | 401 | 403)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: &'static str,
}

impl Classified {
    fn of(kind: ErrorKind) -> Self {
        Self {
            kind,
            status: kind.status(),
            message: kind.user_message(),
        }
    }
}

struct Rule {
    kind: ErrorKind,
    statuses: &'static [u16],
    needles: &'static [&'static str],
}

impl Rule {
    fn matches(&self, status: Option<u16>, message: &str) -> bool {
        if let Some(s) = status {
            if self.statuses.contains(&s) {
                return true;
            }
        }
        self.needles.iter().any(|n| message.contains(n))
    }
}

/// Ordered classification rules; earlier rules win.
const RULES: &[Rule] = &[
    Rule {
        kind: ErrorKind::Network,
        statuses: &[],
        needles: &["fetch"],
    },
    Rule {
        kind: ErrorKind::ServiceUnavailable,
        statuses: &[503],
        needles: &["Service Unavailable", "503"],
    },
    Rule {
        kind: ErrorKind::RateLimited,
        statuses: &[429],
        needles: &["429", "Too Many Requests", "quota"],
    },
    Rule {
        kind: ErrorKind::Auth,
        statuses: &[401, 403],
        needles: &["API key"],
    },
    Rule {
        kind: ErrorKind::BadRequest,
        statuses: &[400],
        needles: &[],
    },
    Rule {
        kind: ErrorKind::Timeout,
        statuses: &[],
        needles: &["timeout"],
    },
];

/// Classifies any [`LlmError`] into a displayable `{kind, status, message}`.
/// Pure and deterministic; never fails.
pub fn classify_error(error: &LlmError) -> Classified {
    // Transport errors carry no status and no stable message text, so map
    // them structurally before consulting the table.
    if let LlmError::Http(e) = error {
        if e.is_timeout() {
            return Classified::of(ErrorKind::Timeout);
        }
        if e.is_connect() || e.is_request() {
            return Classified::of(ErrorKind::Network);
        }
    }

    let status = match error {
        LlmError::Api { status, .. } => Some(*status),
        LlmError::EmptyPrompt => Some(400),
        _ => None,
    };
    let message = error.to_string();

    for rule in RULES {
        if rule.matches(status, &message) {
            return Classified::of(rule.kind);
        }
    }

    Classified::of(ErrorKind::Unknown)
}
