//! # depiction-datasource
//!
//! Persistence ledger for GUID-identified scene entities.
//!
//! This crate provides:
//! - `Scene`, the entity arena every datasource works against
//! - `Datasource`, which tracks entities, batches save/synchronize/delete
//!   requests and materializes load results
//! - `Loader` and the provided `Index2DLoader` / `IdLoader` / `NamedLoader`,
//!   which decide what should be resident
//! - `JsonlStore` and `MemoryOperation`, two `DatasourceOperation` backends
//!
//! The ledger performs no I/O itself. Backends complete requests through a
//! channel that `Datasource::update` drains once per tick.
//!
//! ## Data model
//!
//! ```text
//! Loader ──desired scopes──▶ LoadScope { entities }
//!                                 │ claims
//!                                 ▼
//! Datasource { Guid → PersistenceData } ──handle──▶ Scene { PersistentEntity }
//!        │ execute / Completion
//!        ▼
//! DatasourceOperation (JsonlStore, MemoryOperation, ...)
//! ```

pub mod config;
pub mod datasource;
pub mod error;
pub mod guid;
pub mod id_loader;
pub mod index2d_loader;
pub mod json;
pub mod jsonl;
pub mod loader;
pub mod memory;
pub mod operation;
pub mod persistence;
pub mod query;
pub mod reload;
pub mod scene;

pub use config::{DatasourceConfig, Index2DConfig};
pub use datasource::{
    Datasource, EntitySummary, LedgerSummary, LoaderSummary, QueuedSummary, ScopeSummary,
};
pub use error::DatasourceError;
pub use guid::Guid;
pub use id_loader::{IdLoader, NamedLoader};
pub use index2d_loader::Index2DLoader;
pub use jsonl::{
    JsonlError, JsonlStore, load_entities, persist_entities, read_entities, write_entities,
};
pub use loader::{LoadScope, Loader, LoaderBase, ScopeKey, ScopeState};
pub use memory::MemoryOperation;
pub use operation::{
    Completion, DatasourceOperation, LoadRequest, OperationCallback, OperationOutcome,
    OperationQueue, OperationRequest, OperationResult, PersistenceOperationData, ResultRecord,
    Ticket,
};
pub use persistence::{OperationCapabilities, OperationKind, PersistenceData};
pub use reload::{ReloadState, ReloadTracker};
pub use scene::{EntityHandle, Lifecycle, PersistentEntity, Scene};
