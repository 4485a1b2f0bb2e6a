mod handler;
pub mod job;

pub use handler::{BackupHandler, Outcome, JOB_TYPE};
