use crate::job::{self, cancellation};
use bunker_core::{
    config::ConfigError,
    pipeline::{self, RunError},
    strategy::BackupError,
    Artifact, CancelFlag, Config,
};
use std::sync::Arc;

/// Job-type identifier the handler is registered under with the external
/// scheduler.
pub const JOB_TYPE: &str = "sqlite-backup";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(Artifact),
    Cancelled(cancellation::Reason),
}

/// Handles one backup trigger per invocation. The configuration is validated
/// at construction and immutable for the handler's lifetime; the scheduler is
/// expected to serialize invocations.
#[derive(Debug)]
pub struct BackupHandler {
    config: Arc<Config>,
}

impl BackupHandler {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(BackupHandler {
            config: Arc::new(config),
        })
    }

    #[tracing::instrument(name = "job", skip_all, fields(id = %job.id, job_type = JOB_TYPE))]
    pub async fn handle(
        &self,
        job: job::Job,
        mut cancellation: cancellation::Listener,
    ) -> eyre::Result<Outcome> {
        let cancel = CancelFlag::new();
        let config = self.config.clone();
        let flag = cancel.clone();
        let mut task = tokio::task::spawn_blocking(move || pipeline::run_backup(&config, &flag));

        tokio::select! {
            result = &mut task => {
                let artifact = result??;
                tracing::info!(artifact = %artifact.file_name, "finished successfully");
                Ok(Outcome::Completed(artifact))
            }
            reason = cancellation.requested() => {
                tracing::info!(?reason, "cancellation requested, stopping at the next step boundary");
                cancel.cancel();
                // wait for the copy loop to stop and scoped cleanup to run
                let result = (&mut task).await?;
                cancellation.confirm_stopped();
                match result {
                    Err(RunError::Create(BackupError::Cancelled)) => {
                        tracing::info!("cancelled");
                        Ok(Outcome::Cancelled(reason))
                    }
                    // the run finished before the copy loop saw the flag
                    Ok(artifact) => {
                        tracing::info!(artifact = %artifact.file_name, "finished before cancellation took effect");
                        Ok(Outcome::Completed(artifact))
                    }
                    Err(error) => {
                        tracing::error!(%error, "failed");
                        Err(error.into())
                    }
                }
            }
        }
    }
}
