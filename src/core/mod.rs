//! Core data models: sources, fetch results, state and scheduling

mod currency;
mod fetch;
mod scheduler;
mod snapshot;
mod source;
mod state;

pub use currency::*;
pub use fetch::*;
pub use scheduler::*;
pub use snapshot::*;
pub use source::*;
pub use state::*;
