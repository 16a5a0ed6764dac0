//! LeadSync Core - Domain types, validation, reconciliation and configuration.

pub mod chunk;
pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod sync;
pub mod validation;

pub use config::{
    default_config_path, load_settings, CrmConfig, DbConfig, EmailMatching, HttpConfig, Settings,
    SyncConfig, DEFAULT_CRM_BASE_URL,
};
pub use error::AppError;
pub use models::{ImportLog, NewImportLog, Record, UpsertAction, UpsertResult};
pub use service::{ContactUpserter, ImportLogStore, RecordedSync, SyncService};
pub use sync::{
    aggregate, Aggregator, ChunkOutcome, ErrorEntry, RejectionGroup, SyncDetails, SyncSummary,
};
