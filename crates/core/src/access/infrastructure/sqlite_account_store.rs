use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::access::domain::account::{TrialMetadata, UserAccount};
use crate::access::domain::account_store::{AccountStore, StoreError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

const SELECT_COLUMNS: &str =
    "SELECT username, password_hash, api_key, is_first_week, purchase_timestamp FROM accounts";

/// Account store backed by a SQLite database file.
///
/// A fresh connection is opened for every operation and dropped on return,
/// so no connection outlives a single request.
pub struct SqliteAccountStore {
    path: PathBuf,
}

impl SqliteAccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the `accounts` table if it does not exist.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                api_key TEXT UNIQUE,
                is_first_week INTEGER,
                purchase_timestamp TEXT
            );",
        )
        .map_err(unavailable)
    }

    /// Insert or replace a full account record.
    pub fn upsert_account(&self, account: &UserAccount) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let (is_first_week, purchased_at) = match &account.trial_metadata {
            Some(meta) => (
                Some(meta.is_first_week),
                Some(format_timestamp(meta.purchase_timestamp)),
            ),
            None => (None, None),
        };
        conn.execute(
            "INSERT INTO accounts (username, password_hash, api_key, is_first_week, purchase_timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(username) DO UPDATE SET
                password_hash = excluded.password_hash,
                api_key = excluded.api_key,
                is_first_week = excluded.is_first_week,
                purchase_timestamp = excluded.purchase_timestamp",
            params![
                account.username,
                account.password_hash,
                account.api_key,
                is_first_week,
                purchased_at
            ],
        )
        .map_err(unavailable)?;
        Ok(())
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path).map_err(unavailable)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(unavailable)?;
        Ok(conn)
    }

    fn find_one(&self, column: &str, value: &str) -> Result<Option<UserAccount>, StoreError> {
        let conn = self.connect()?;
        let sql = format!("{SELECT_COLUMNS} WHERE {column} = ?1");
        let raw = conn
            .query_row(&sql, params![value], RawAccount::from_row)
            .optional()
            .map_err(unavailable)?;
        raw.map(RawAccount::into_account).transpose()
    }
}

impl AccountStore for SqliteAccountStore {
    fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        self.find_one("username", username)
    }

    fn find_by_api_key(&self, api_key: &str) -> Result<Option<UserAccount>, StoreError> {
        self.find_one("api_key", api_key)
    }

    fn update_trial_metadata(
        &self,
        username: &str,
        metadata: &TrialMetadata,
    ) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE accounts SET is_first_week = ?2, purchase_timestamp = ?3 WHERE username = ?1",
            params![
                username,
                metadata.is_first_week,
                format_timestamp(metadata.purchase_timestamp)
            ],
        )
        .map_err(unavailable)?;
        Ok(())
    }

    fn end_first_week(&self, username: &str) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE accounts SET is_first_week = 0 WHERE username = ?1 AND is_first_week = 1",
                params![username],
            )
            .map_err(unavailable)?;
        Ok(changed == 1)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct RawAccount {
    username: String,
    password_hash: String,
    api_key: Option<String>,
    is_first_week: Option<bool>,
    purchase_timestamp: Option<String>,
}

impl RawAccount {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            username: row.get(0)?,
            password_hash: row.get(1)?,
            api_key: row.get(2)?,
            is_first_week: row.get(3)?,
            purchase_timestamp: row.get(4)?,
        })
    }

    fn into_account(self) -> Result<UserAccount, StoreError> {
        let trial_metadata = match (self.is_first_week, self.purchase_timestamp) {
            (Some(is_first_week), Some(raw)) => {
                let purchase_timestamp = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| StoreError::CorruptRecord {
                        username: self.username.clone(),
                        reason: format!("purchase_timestamp {raw:?}: {e}"),
                    })?
                    .with_timezone(&Utc);
                Some(TrialMetadata {
                    is_first_week,
                    purchase_timestamp,
                })
            }
            _ => None,
        };
        Ok(UserAccount {
            username: self.username,
            password_hash: self.password_hash,
            api_key: self.api_key,
            trial_metadata,
        })
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn unavailable(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}
