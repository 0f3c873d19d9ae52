pub mod config;
pub mod logging;

pub mod catalog;
pub mod cleanup;
pub mod executor;
pub mod mux;
pub mod naming;
pub mod orchestrator;
pub mod progress;
pub mod prompt;
pub mod reference;
pub mod resolution;
pub mod resolver;
pub mod retry;
pub mod transfer;
