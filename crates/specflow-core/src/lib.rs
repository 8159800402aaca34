pub mod agents;
pub mod allocator;
pub mod artifact;
pub mod config;
pub mod context;
pub mod error;
pub mod feature;
pub mod gate;
pub mod git;
pub mod io;
pub mod paths;
pub mod tasks;
pub mod template;
pub mod types;

pub use error::{Result, SpecflowError};
