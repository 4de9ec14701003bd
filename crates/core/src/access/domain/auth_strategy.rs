use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::account::AuthDecision;
use super::account_store::AccountStore;
use super::password_hash::PasswordHash;
use super::request_context::{BasicCredentials, RequestContext};
use super::trial_policy::{evaluate_trial, TrialVerdict};
use super::trusted_origins::TrustedOrigins;

/// One way of authorizing a request.
///
/// `None` means the strategy does not apply to this request and the next one
/// should be consulted; `Some` is final.
pub trait AuthStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, context: &RequestContext, now: DateTime<Utc>) -> Option<AuthDecision>;
}

// ---------------------------------------------------------------------------
// Trusted origin
// ---------------------------------------------------------------------------

pub struct TrustedOriginStrategy {
    origins: TrustedOrigins,
}

impl TrustedOriginStrategy {
    pub fn new(origins: TrustedOrigins) -> Self {
        Self { origins }
    }
}

impl AuthStrategy for TrustedOriginStrategy {
    fn name(&self) -> &'static str {
        "trusted-origin"
    }

    fn evaluate(&self, context: &RequestContext, _now: DateTime<Utc>) -> Option<AuthDecision> {
        self.origins
            .matches(context.origin.as_deref(), context.referer.as_deref())
            .then(AuthDecision::anonymous)
    }
}

// ---------------------------------------------------------------------------
// API key
// ---------------------------------------------------------------------------

pub struct ApiKeyStrategy {
    store: Arc<dyn AccountStore>,
}

impl ApiKeyStrategy {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }
}

impl AuthStrategy for ApiKeyStrategy {
    fn name(&self) -> &'static str {
        "api-key"
    }

    fn evaluate(&self, context: &RequestContext, _now: DateTime<Utc>) -> Option<AuthDecision> {
        let key = context.api_key.as_deref().filter(|k| !k.is_empty())?;
        let decision = match self.store.find_by_api_key(key) {
            Ok(Some(account)) => AuthDecision::allow(account.username),
            Ok(None) => AuthDecision::deny(),
            Err(e) => {
                log::warn!("API key lookup failed: {e}");
                AuthDecision::deny()
            }
        };
        Some(decision)
    }
}

// ---------------------------------------------------------------------------
// Password with trial decay
// ---------------------------------------------------------------------------

pub struct PasswordTrialStrategy {
    store: Arc<dyn AccountStore>,
}

impl PasswordTrialStrategy {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    fn decide(&self, credentials: &BasicCredentials, now: DateTime<Utc>) -> AuthDecision {
        let username = credentials.username.as_str();
        let account = match self.store.find_by_username(username) {
            Ok(Some(account)) => account,
            Ok(None) => {
                PasswordHash::dummy().verify(&credentials.password);
                return AuthDecision::deny();
            }
            Err(e) => {
                log::warn!("Account lookup failed: {e}");
                return AuthDecision::deny();
            }
        };

        let Some(metadata) = account.trial_metadata else {
            log::info!("Denied {username}: account has no trial metadata");
            return AuthDecision::deny();
        };

        let evaluation = evaluate_trial(&metadata, now);
        if evaluation.end_first_week {
            match self.store.end_first_week(username) {
                Ok(true) => log::info!("First week ended for {username}"),
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Failed to end first week for {username}: {e}");
                    return AuthDecision::deny();
                }
            }
        }

        match evaluation.verdict {
            TrialVerdict::RequirePassword => {}
            TrialVerdict::Expired => {
                log::info!("Denied {username}: access window expired");
                return AuthDecision::deny();
            }
            TrialVerdict::NotYetValid => {
                log::info!("Denied {username}: purchase timestamp in the future");
                return AuthDecision::deny();
            }
        }

        let hash = match PasswordHash::parse(&account.password_hash) {
            Ok(hash) => hash,
            Err(e) => {
                log::warn!("Stored password hash for {username} unusable: {e}");
                return AuthDecision::deny();
            }
        };
        if hash.verify(&credentials.password) {
            AuthDecision::allow(account.username)
        } else {
            AuthDecision::deny()
        }
    }
}

impl AuthStrategy for PasswordTrialStrategy {
    fn name(&self) -> &'static str {
        "password-trial"
    }

    fn evaluate(&self, context: &RequestContext, now: DateTime<Utc>) -> Option<AuthDecision> {
        let credentials = context.credentials.as_ref()?;
        Some(self.decide(credentials, now))
    }
}
