//! # kasir-db: Data Access Layer for Kasir POS
//!
//! One polymorphic data-access interface with interchangeable backends.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir POS Data Flow                              │
//! │                                                                         │
//! │  SettlementEngine / ReportingAggregator (kasir-engine)                 │
//! │       │  Arc<dyn PosStore>                                             │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kasir-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   store.rs: TransactionStore + SettlementLedger = PosStore      │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────┐  │   │
//! │  │   │  Database  │ │ RedisStore │ │ LocalStore │ │    Not     │  │   │
//! │  │   │  (SQLite)  │ │ (document) │ │ (JSON file)│ │ Configured │  │   │
//! │  │   └────────────┘ └────────────┘ └────────────┘ └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   backend.rs: connect(&BackendConfig) picks one at startup      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The data-access contracts
//! - [`pool`] - SQLite pool creation and configuration
//! - [`migrations`] - Embedded SQLite migrations
//! - [`repository`] - SQLite repositories
//! - [`redis_store`] - Redis document store
//! - [`local`] - In-process store with JSON-file persistence
//! - [`not_configured`] - Empty-read, failing-write stand-in
//! - [`backend`] - Runtime backend selection
//! - [`error`] - Storage error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasir_db::{connect, BackendConfig};
//!
//! let store = connect(&BackendConfig::default()).await;
//! let last = store.get_last_settlement("store-1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod error;
pub mod local;
pub mod migrations;
pub mod not_configured;
pub mod pool;
pub mod redis_store;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{connect, default_local_path, try_connect, BackendChoice, BackendConfig};
pub use error::{DbError, DbResult};
pub use local::LocalStore;
pub use not_configured::NotConfiguredStore;
pub use pool::{Database, DbConfig};
pub use redis_store::RedisStore;
pub use store::{BackendKind, PosStore, SettlementLedger, TransactionStore};

// Repository re-exports for convenience
pub use repository::settlement::SettlementRepository;
pub use repository::transaction::TransactionRepository;
