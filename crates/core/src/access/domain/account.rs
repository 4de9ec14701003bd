use chrono::{DateTime, Utc};

/// Issuance record for a purchased account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrialMetadata {
    pub is_first_week: bool,
    pub purchase_timestamp: DateTime<Utc>,
}

/// A stored account. Access control only ever reads these fields, except for
/// the one-way `is_first_week` transition performed through the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAccount {
    pub username: String,
    pub password_hash: String,
    pub api_key: Option<String>,
    pub trial_metadata: Option<TrialMetadata>,
}

/// Outcome of authorizing one request. Never cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthDecision {
    pub allowed: bool,
    pub principal: Option<String>,
}

impl AuthDecision {
    pub fn deny() -> Self {
        Self {
            allowed: false,
            principal: None,
        }
    }

    /// Allowed without an authenticated principal (trusted origin).
    pub fn anonymous() -> Self {
        Self {
            allowed: true,
            principal: None,
        }
    }

    pub fn allow(principal: impl Into<String>) -> Self {
        Self {
            allowed: true,
            principal: Some(principal.into()),
        }
    }
}
