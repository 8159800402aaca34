//! Per-agent context files: the agent registry, the three-region document
//! model, context derived from a plan, and the synchronizer that writes
//! them.

pub mod derive;
pub mod document;
pub mod profile;
pub mod sync;

pub use derive::DerivedContext;
pub use profile::{builtin_profiles, AgentFormat, AgentProfile, SectionMarkers};
pub use sync::{SyncOutcome, SyncReport, Synchronizer};
