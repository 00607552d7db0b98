//! services/api/src/agents/mod.rs
//!
//! The agent hierarchy: the master agent handles onboarding, one worker per
//! topic runs fetch strategies, and the fleet coordinator sweeps workers.

pub mod fleet;
pub mod master;
pub mod worker;

pub use fleet::{FleetCoordinator, SweepReport, TopicReport};
pub use master::{MasterAgent, OnboardingOutcome, TopicSubmission};
pub use worker::{FetchOutcome, TopicWorker};
