// Training job submission for speech-data
// Hands a training request to the out-of-process pipeline through a control file

mod job;
mod remote_shell;
mod ssh;
mod watch_dir;

pub use job::TrainingJob;
pub use remote_shell::{shell_quote, RemoteShell, RemoteShellSubmitter, ShellSession};
pub use ssh::SshShell;
pub use watch_dir::WatchDirSubmitter;

use thiserror::Error;

/// Failure while handing a job to the training pipeline
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("could not open remote session: {0}")]
    Connect(String),

    #[error("remote command `{command}` failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can deliver a training job to the external pipeline.
///
/// Delivery is fire-and-forget: success means the control file was placed,
/// not that the pipeline consumed it.
pub trait TrainingJobSubmitter: Send + Sync {
    fn submit(&self, job: &TrainingJob) -> Result<(), SubmitError>;
}
