use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::account::AuthDecision;
use super::account_store::AccountStore;
use super::auth_strategy::{ApiKeyStrategy, AuthStrategy, PasswordTrialStrategy, TrustedOriginStrategy};
use super::request_context::RequestContext;
use super::trusted_origins::TrustedOrigins;

/// Decides whether a request may reach the inference pipeline.
///
/// Strategies run in a fixed order: trusted origin, API key, password with
/// trial decay. The first strategy that applies decides; if none applies the
/// request is denied.
pub struct AccessController {
    strategies: Vec<Box<dyn AuthStrategy>>,
}

impl AccessController {
    pub fn new(origins: TrustedOrigins, store: Arc<dyn AccountStore>) -> Self {
        Self {
            strategies: vec![
                Box::new(TrustedOriginStrategy::new(origins)),
                Box::new(ApiKeyStrategy::new(store.clone())),
                Box::new(PasswordTrialStrategy::new(store)),
            ],
        }
    }

    pub fn authorize(&self, context: &RequestContext, now: DateTime<Utc>) -> AuthDecision {
        for strategy in &self.strategies {
            if let Some(decision) = strategy.evaluate(context, now) {
                log::debug!(
                    "{} strategy decided allowed={} principal={:?}",
                    strategy.name(),
                    decision.allowed,
                    decision.principal
                );
                return decision;
            }
        }
        log::debug!("No authorization strategy applied");
        AuthDecision::deny()
    }
}
