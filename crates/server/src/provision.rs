use chrono::{DateTime, Utc};
use facemood_core::access::domain::account::{TrialMetadata, UserAccount};
use facemood_core::access::domain::account_store::StoreError;
use facemood_core::access::domain::password_hash::PasswordHash;
use facemood_core::access::infrastructure::sqlite_account_store::SqliteAccountStore;

use crate::config::AddAccountArgs;

/// Build the account described by `args`, hashing the password with a fresh
/// salt. A trial starts in its first week.
pub fn build_account(args: &AddAccountArgs, now: DateTime<Utc>) -> UserAccount {
    let purchase_timestamp = match (args.purchased_at, args.trial) {
        (Some(at), _) => Some(at),
        (None, true) => Some(now),
        (None, false) => None,
    };
    UserAccount {
        username: args.username.clone(),
        password_hash: PasswordHash::generate(&args.password).encode(),
        api_key: args.api_key.clone(),
        trial_metadata: purchase_timestamp.map(|purchase_timestamp| TrialMetadata {
            is_first_week: true,
            purchase_timestamp,
        }),
    }
}

pub fn add_account(
    store: &SqliteAccountStore,
    args: &AddAccountArgs,
    now: DateTime<Utc>,
) -> Result<UserAccount, StoreError> {
    store.ensure_schema()?;
    let account = build_account(args, now);
    store.upsert_account(&account)?;
    Ok(account)
}
