// SSH remote shell for speech-data
// OpenSSH control-master sessions; password auth goes through `sshpass -e`

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use uuid::Uuid;

use super::remote_shell::{RemoteShell, ShellSession};
use super::SubmitError;
use crate::config::TrainingHostConfig;

/// Unix socket paths are capped near 104 bytes and ssh appends a random
/// suffix while binding, so the socket lives under a short directory
const CONTROL_SOCKET_DIR: &str = "/tmp";

/// Socket path for one master connection
fn control_socket_path(tag: &str) -> PathBuf {
    let dir = Path::new(CONTROL_SOCKET_DIR);
    let dir = if dir.is_dir() {
        dir.to_path_buf()
    } else {
        std::env::temp_dir()
    };
    dir.join(format!("sd-{}", tag))
}

/// Remote shell on the GPU host, driven through the system `ssh` binary
#[derive(Clone)]
pub struct SshShell {
    host: String,
    port: u16,
    username: String,
    password: Option<String>,
    connect_timeout_secs: u64,
}

impl SshShell {
    pub fn new(config: &TrainingHostConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
            connect_timeout_secs: config.connect_timeout_secs,
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// Arguments for opening the master connection
    fn master_args(&self, socket: &Path, log_file: &Path) -> Vec<String> {
        let mut args = vec![
            "-M".to_string(),
            "-S".to_string(),
            socket.display().to_string(),
            "-f".to_string(),
            "-N".to_string(),
            "-E".to_string(),
            log_file.display().to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
        ];
        if self.password.is_none() {
            args.push("-o".to_string());
            args.push("BatchMode=yes".to_string());
        }
        args.push("-p".to_string());
        args.push(self.port.to_string());
        args.push(self.destination());
        args
    }

    /// Arguments for a command multiplexed over an open master
    fn control_args(&self, socket: &Path) -> Vec<String> {
        vec![
            "-S".to_string(),
            socket.display().to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-p".to_string(),
            self.port.to_string(),
            self.destination(),
        ]
    }
}

impl RemoteShell for SshShell {
    type Session = SshSession;

    fn open(&self) -> Result<SshSession, SubmitError> {
        let tag = Uuid::new_v4().simple().to_string();
        let socket = control_socket_path(&tag[..12]);
        let log_file = std::env::temp_dir().join(format!("speech-data-ssh-{}.log", tag));

        let mut command = match &self.password {
            Some(password) => {
                let mut command = Command::new("sshpass");
                command.arg("-e").arg("ssh").env("SSHPASS", password);
                command
            }
            None => Command::new("ssh"),
        };

        // The backgrounded master keeps inherited descriptors open, so its
        // diagnostics go to a log file instead of a pipe
        command
            .args(self.master_args(&socket, &log_file))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        log::info!("Opening SSH session to {}:{}", self.host, self.port);

        let status = command.status().map_err(|e| {
            SubmitError::Connect(format!("failed to spawn ssh: {}", e))
        })?;

        if !status.success() {
            let diagnostics = std::fs::read_to_string(&log_file).unwrap_or_default();
            let _ = std::fs::remove_file(&log_file);
            log::error!("SSH session to {} failed: {}", self.host, diagnostics.trim());
            return Err(SubmitError::Connect(format!(
                "{} ({})",
                diagnostics.trim(),
                status
            )));
        }

        Ok(SshSession {
            shell: self.clone(),
            socket,
            log_file,
            open: true,
        })
    }
}

/// An open control-master connection; closed on drop if not closed explicitly
pub struct SshSession {
    shell: SshShell,
    socket: PathBuf,
    log_file: PathBuf,
    open: bool,
}

impl SshSession {
    fn exit_master(&mut self) -> Result<(), SubmitError> {
        self.open = false;

        let output = Command::new("ssh")
            .args(self.shell.control_args(&self.socket))
            .arg("-O")
            .arg("exit")
            .stdin(Stdio::null())
            .output();

        let _ = std::fs::remove_file(&self.log_file);

        let output = output?;
        if !output.status.success() {
            return Err(SubmitError::Command {
                command: "ssh -O exit".to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        log::debug!("SSH session to {} closed", self.shell.host);
        Ok(())
    }
}

impl ShellSession for SshSession {
    fn exec(&mut self, command: &str) -> Result<(), SubmitError> {
        let output = Command::new("ssh")
            .args(self.shell.control_args(&self.socket))
            .arg("--")
            .arg(command)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(SubmitError::Command {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }

    fn close(mut self) -> Result<(), SubmitError> {
        self.exit_master()
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.exit_master() {
                log::warn!("Failed to close SSH session to {}: {}", self.shell.host, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(password: Option<&str>) -> SshShell {
        SshShell::new(&TrainingHostConfig {
            host: "gpu.internal".into(),
            port: 2222,
            username: "trainer".into(),
            password: password.map(str::to_string),
            connect_timeout_secs: 15,
        })
    }

    #[test]
    fn test_master_args_without_password_use_batch_mode() {
        let args = shell(None).master_args(&PathBuf::from("/tmp/s"), &PathBuf::from("/tmp/s.log"));

        assert!(args.iter().any(|a| a == "BatchMode=yes"));
        assert!(args.iter().any(|a| a == "ConnectTimeout=15"));
        assert_eq!(args.last().unwrap(), "trainer@gpu.internal");
        assert_eq!(&args[..3], &["-M", "-S", "/tmp/s"]);
    }

    #[test]
    fn test_password_never_reaches_arguments() {
        let args = shell(Some("hunter2")).master_args(&PathBuf::from("/tmp/s"), &PathBuf::from("/tmp/s.log"));

        assert!(!args.iter().any(|a| a.contains("hunter2")));
        assert!(!args.iter().any(|a| a == "BatchMode=yes"));
    }

    #[test]
    fn test_control_socket_path_is_short() {
        let tag = Uuid::new_v4().simple().to_string();
        let socket = control_socket_path(&tag[..12]);

        // ssh binds "<path>.<16 random chars>" first
        assert!(socket.as_os_str().len() + 17 < 104, "{:?}", socket);
        assert!(socket.ends_with(format!("sd-{}", &tag[..12])));
    }

    #[test]
    fn test_control_args_target_port() {
        let args = shell(None).control_args(&PathBuf::from("/tmp/s"));
        assert_eq!(args, vec!["-S", "/tmp/s", "-o", "BatchMode=yes", "-p", "2222", "trainer@gpu.internal"]);
    }
}
