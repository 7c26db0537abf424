//! Conversation layer: turns chat events into conversion jobs and relays the
//! results back through a channel.

pub mod client;
pub mod error;
pub mod orchestrator;
pub mod prompts;

pub use {
    client::{ConversionClient, Converted, HttpConversionClient},
    error::{Error, Result},
    orchestrator::Orchestrator,
};
