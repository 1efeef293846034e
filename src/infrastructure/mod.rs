//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain and utility layers,
//! providing concrete storage and outbound network access.
//!
//! # Modules
//!
//! - [`network`] - DNS resolver and HTTP reachability probe
//! - [`persistence`] - PostgreSQL and in-memory repository implementations

pub mod network;
pub mod persistence;
