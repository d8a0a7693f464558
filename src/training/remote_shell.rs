// Remote shell submitter for speech-data
// Assembles the control file in a staging path on the host, then moves it into the watch directory

use uuid::Uuid;

use super::{SubmitError, TrainingJob, TrainingJobSubmitter};

/// Opens authenticated sessions to the training host
pub trait RemoteShell: Send + Sync {
    type Session: ShellSession;

    fn open(&self) -> Result<Self::Session, SubmitError>;
}

/// An open session that runs shell commands in order
pub trait ShellSession {
    fn exec(&mut self, command: &str) -> Result<(), SubmitError>;

    fn close(self) -> Result<(), SubmitError>;
}

/// Submits jobs by writing the control file through a remote shell
pub struct RemoteShellSubmitter<S> {
    shell: S,
    watch_dir: String,
    control_file_name: String,
}

impl<S: RemoteShell> RemoteShellSubmitter<S> {
    pub fn new(shell: S, watch_dir: impl Into<String>, control_file_name: impl Into<String>) -> Self {
        Self {
            shell,
            watch_dir: watch_dir.into(),
            control_file_name: control_file_name.into(),
        }
    }

    /// The ordered command sequence that materializes the control file
    pub fn commands(&self, job: &TrainingJob, staging_name: &str) -> Vec<String> {
        let staging = shell_quote(staging_name);
        let target = format!(
            "{}/{}",
            self.watch_dir.trim_end_matches('/'),
            self.control_file_name
        );

        let mut commands = vec![format!(": > {}", staging)];
        for line in job.control_file_lines() {
            commands.push(format!("printf '%s\\n' {} >> {}", shell_quote(&line), staging));
        }
        commands.push(format!("mv {} {}", staging, shell_quote(&target)));
        commands
    }
}

impl<S: RemoteShell> TrainingJobSubmitter for RemoteShellSubmitter<S> {
    fn submit(&self, job: &TrainingJob) -> Result<(), SubmitError> {
        let staging_name = format!("{}.{}.part", self.control_file_name, Uuid::new_v4().simple());
        let commands = self.commands(job, &staging_name);

        let mut session = self.shell.open()?;

        let result = commands.iter().try_for_each(|command| {
            log::debug!("Remote: {}", command);
            session.exec(command)
        });

        // Close on both paths; a command failure wins over a close failure
        let closed = session.close();
        result?;
        closed?;

        log::info!(
            "Training job for '{}' dropped into {}",
            job.speech_api_name,
            self.watch_dir
        );
        Ok(())
    }
}

/// Quote a value as a single POSIX shell word
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'\''"#))
}
