pub mod cancel;
pub mod compress;
pub mod config;
pub mod manifest;
pub mod pipeline;
mod progress;
pub mod strategy;

pub use cancel::CancelFlag;
pub use config::{Config, Strategy};
pub use pipeline::{run_backup, Artifact};
