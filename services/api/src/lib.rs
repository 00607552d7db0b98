//! services/api/src/lib.rs
//!
//! The API service crate: adapters over the core ports, the agent
//! hierarchy, the background scheduler, and the HTTP layer.

pub mod adapters;
pub mod agents;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;
