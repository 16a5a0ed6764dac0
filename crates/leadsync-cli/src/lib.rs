//! LeadSync CLI - Command-line interface for LeadSync
//!
//! This crate provides the CLI application that ties together all LeadSync components.

pub mod config;
pub mod input;

pub use config::{Command, Config};
