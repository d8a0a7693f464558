// Watch-directory submitter for speech-data
// Drops the control file into a locally mounted watch directory

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use uuid::Uuid;

use super::{SubmitError, TrainingJob, TrainingJobSubmitter};

/// Writes the control file next to its target and renames it into place
pub struct WatchDirSubmitter {
    watch_dir: PathBuf,
    control_file_name: String,
}

impl WatchDirSubmitter {
    pub fn new(watch_dir: impl Into<PathBuf>, control_file_name: impl Into<String>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            control_file_name: control_file_name.into(),
        }
    }
}

impl TrainingJobSubmitter for WatchDirSubmitter {
    fn submit(&self, job: &TrainingJob) -> Result<(), SubmitError> {
        if !self.watch_dir.is_dir() {
            return Err(SubmitError::Connect(format!(
                "watch directory {:?} is not available",
                self.watch_dir
            )));
        }

        // Hidden staging name so the watcher ignores the file until the rename
        let staging = self.watch_dir.join(format!(
            ".{}.{}.part",
            self.control_file_name,
            Uuid::new_v4().simple()
        ));
        let target = self.watch_dir.join(&self.control_file_name);

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&staging)?;
            file.write_all(job.control_file_contents().as_bytes())?;
            file.sync_all()?;
            fs::rename(&staging, &target)
        };

        if let Err(e) = write() {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }

        log::info!(
            "Training job for '{}' written to {:?}",
            job.speech_api_name,
            target
        );
        Ok(())
    }
}
