pub mod cli;
pub mod engine;
pub mod error;
pub mod export;
pub mod ledger;
pub mod model;
pub mod normalize;
pub mod orchestrator;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;
