//! Parameters carried by incoming redirects.
//!
//! Parsing never fails on unknown or repeated keys; the first occurrence of a
//! key wins and blank values count as absent.

use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};

use crate::error::SessionExchangeError;

/// Longest identity-provider session id we accept.
const MAX_SESSION_ID_LEN: usize = 512;

fn first_param(raw: &str, key: &str) -> Option<String> {
    let raw = raw.trim_start_matches(['#', '?']);
    url::form_urlencoded::parse(raw.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Identity-provider credential from the location fragment.
#[derive(Debug, Clone)]
pub struct SessionPayload {
    session_id: SecretString,
}

impl SessionPayload {
    /// Extract and validate `session_id` from a raw fragment (`#a=b&...`).
    pub fn from_fragment(fragment: &str) -> Result<Self, SessionExchangeError> {
        let session_id =
            first_param(fragment, "session_id").ok_or(SessionExchangeError::MissingCredential)?;

        let well_formed = session_id.len() <= MAX_SESSION_ID_LEN
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !well_formed {
            return Err(SessionExchangeError::MissingCredential);
        }

        Ok(Self {
            session_id: SecretString::from(session_id),
        })
    }

    /// Extract from a full location URL.
    pub fn from_location(location: &Url) -> Result<Self, SessionExchangeError> {
        Self::from_fragment(location.fragment().unwrap_or_default())
    }

    pub fn session_id(&self) -> &str {
        self.session_id.expose_secret()
    }
}

/// OAuth authorization callback parameters from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthPayload {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Provider-reported error code, e.g. `access_denied`.
    pub error: Option<String>,
}

impl OAuthPayload {
    pub fn from_query(query: &str) -> Self {
        Self {
            code: first_param(query, "code"),
            state: first_param(query, "state"),
            error: first_param(query, "error"),
        }
    }

    pub fn from_location(location: &Url) -> Self {
        Self::from_query(location.query().unwrap_or_default())
    }
}

/// Payment gateway return parameters from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentPayload {
    pub session_id: Option<String>,
    /// Optional `status` hint appended by the gateway return URL.
    pub status_hint: Option<String>,
}

impl PaymentPayload {
    pub fn from_query(query: &str) -> Self {
        Self {
            session_id: first_param(query, "session_id"),
            status_hint: first_param(query, "status"),
        }
    }

    pub fn from_location(location: &Url) -> Self {
        Self::from_query(location.query().unwrap_or_default())
    }

    /// Whether the return URL says the user cancelled at the gateway.
    pub fn is_cancelled(&self) -> bool {
        self.status_hint.as_deref().is_some_and(|s| {
            s.eq_ignore_ascii_case("cancelled") || s.eq_ignore_ascii_case("canceled")
        })
    }
}

/// `location` with query and fragment removed, for scrubbing history.
pub fn without_credentials(location: &Url) -> String {
    location.path().to_string()
}
