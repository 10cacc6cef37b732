// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod orchestrator;
mod report;

pub use orchestrator::{Orchestrator, apply_channel};
pub use report::{ChannelOutcome, FileOutcome, RunReport, RunStats};
