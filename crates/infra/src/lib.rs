//! Infrastructure layer: persistence, catalog adjuster, config, and the
//! material store service that composes them.

pub mod catalog;
pub mod config;
pub mod schema;
pub mod service;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use catalog::{
    AdjusterError, CatalogStockAdjuster, CatalogStockAdjustment, InMemoryCatalogAdjuster,
    PostgresCatalogAdjuster,
};
pub use config::{AppConfig, ConfigError};
pub use service::MaterialStoreService;
pub use store::{
    AnalyticsFilter, InMemoryLedgerStore, LedgerStore, LedgerTx, PostgresLedgerStore, StoreError,
    TransactionFilter,
};

/// Service wired to the in-memory store (tests/dev).
pub type InMemoryMaterialStoreService = MaterialStoreService<InMemoryLedgerStore, InMemoryCatalogAdjuster>;

/// Service wired to Postgres.
pub type PostgresMaterialStoreService = MaterialStoreService<PostgresLedgerStore, PostgresCatalogAdjuster>;
