pub mod command;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod sequencer;

pub use command::{PlaylistRef, UpdateCommand};
pub use orchestrator::{UpdateOrchestrator, UpdateOutcome, UpdateResult};
