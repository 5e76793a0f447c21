//! Error types for the callback orchestrators.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Session exchange error: {0}")]
    SessionExchange(#[from] SessionExchangeError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures talking to the identity provider or the backend.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error(
        "{endpoint} returned HTTP {status}{}",
        .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
    )]
    Status {
        endpoint: String,
        status: u16,
        detail: Option<String>,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl RemoteError {
    /// Server-supplied error detail, if the failure carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// Durable client storage errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Session exchange failures. All of them end in a silent redirect to sign-in.
#[derive(Debug, thiserror::Error)]
pub enum SessionExchangeError {
    #[error("No session_id credential in the redirect fragment")]
    MissingCredential,

    #[error("Identity exchange failed: {reason}")]
    IdentityExchangeFailed { reason: String },

    #[error("Backend session creation failed: {reason}")]
    BackendSessionFailed { reason: String },
}

/// Third-party connection callback failures.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Provider denied the connection: {code}")]
    ProviderDenied { code: String },

    #[error("No authorization code in the callback")]
    MissingCode,

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },
}

impl ConnectionError {
    /// Text shown to the user before the delayed redirect.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderDenied { code } => {
                format!("Authorization was denied ({code}). Returning to onboarding...")
            }
            Self::MissingCode => {
                "No authorization code received. Returning to onboarding...".into()
            }
            Self::ConnectionFailed { message } => message.clone(),
        }
    }
}

/// Payment verification failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("No payment session id in the redirect")]
    NoSessionId,

    #[error("Payment session expired")]
    PaymentExpired,

    #[error("Payment status still pending after {attempts} checks")]
    PollTimeout { attempts: u32 },

    #[error("Payment status check failed after {attempts} checks: {reason}")]
    PollTransientFailure { attempts: u32, reason: String },
}

impl PaymentError {
    /// Text shown on the payment result page.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoSessionId => "No session ID found",
            Self::PaymentExpired => "Payment session expired. Please try again.",
            Self::PollTimeout { .. } => {
                "Payment status check timed out. Please check your email for confirmation."
            }
            Self::PollTransientFailure { .. } => {
                "Error checking payment status. Please contact support."
            }
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
