pub mod sqlite_account_store;
