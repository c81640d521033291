//! Persistent store boundary for the material store ledger.
//!
//! A [`LedgerStore`] hands out units of work ([`LedgerTx`]); every balance
//! mutation and log append happens inside one and becomes visible only on
//! commit. Reads that do not need isolation go straight to the store.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::{InMemoryLedgerStore, InMemoryLedgerTx};
pub use postgres::{PostgresLedgerStore, PostgresLedgerTx};
pub use query::{AnalyticsFilter, TRANSACTION_QUERY_LIMIT, TransactionFilter};
pub use r#trait::{LedgerStore, LedgerTx, StoreError};
