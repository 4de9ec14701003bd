use thiserror::Error;

use super::account::{TrialMetadata, UserAccount};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("account store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt account record for {username}: {reason}")]
    CorruptRecord { username: String, reason: String },
}

/// Domain interface for the persistent account store.
///
/// Implementations must be safe to call from concurrent requests; each call
/// acquires and releases its own connection.
pub trait AccountStore: Send + Sync {
    fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError>;

    fn find_by_api_key(&self, api_key: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Overwrite an account's trial metadata. Used by provisioning, not by
    /// access control.
    fn update_trial_metadata(
        &self,
        username: &str,
        metadata: &TrialMetadata,
    ) -> Result<(), StoreError>;

    /// Atomically set `is_first_week = false` if it is still `true`.
    ///
    /// Returns whether this call performed the transition. Calling it again
    /// is a no-op returning `false`.
    fn end_first_week(&self, username: &str) -> Result<bool, StoreError>;
}
