//! LeadSync DB - PostgreSQL persistence for import logs.

pub mod repository;

pub use repository::ImportLogRepository;
