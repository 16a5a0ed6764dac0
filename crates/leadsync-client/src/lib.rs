//! LeadSync Client - HTTP client for the upstream CRM
//!
//! - [`hubspot`] - HubSpot CRM contacts API (batch upsert, create, list)
//!
//! The client implements [`leadsync_core::ContactUpserter`], so it plugs
//! straight into [`leadsync_core::SyncService`].

pub mod hubspot;

pub use hubspot::HubSpotClient;
