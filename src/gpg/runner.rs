//! External-tool invocation with a dedicated machine-readable channel.
//!
//! The tool is run with a fixed, sanitized environment and three captured
//! output channels: human-readable stdout and stderr, and a line-oriented
//! status channel on file descriptor 3. stdout and stderr are drained
//! before the status channel is read to completion - the tool does not
//! flush status until its other buffers are consumed, so reading status
//! first can deadlock. One deadline bounds output collection through the
//! status channel; on expiry the child is killed.
//!
//! Unix only: the status channel relies on `pipe(2)`/`dup2(2)`.

use std::os::unix::io::{AsRawFd, FromRawFd};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use once_cell::sync::Lazy;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::error::VerifyError;

/// Descriptor the child receives the status pipe on
const STATUS_FD: libc::c_int = 3;

/// PATH handed to the tool: the standard system directories that exist
static SANITIZED_PATH: Lazy<String> = Lazy::new(|| {
    ["/usr/local/bin", "/usr/bin", "/bin", "/usr/sbin", "/sbin"]
        .iter()
        .filter(|dir| std::path::Path::new(dir).is_dir())
        .copied()
        .collect::<Vec<_>>()
        .join(":")
});

/// Captured output of one tool invocation.
///
/// A zero exit code only means the tool ran without internal error; trust
/// is decided by evaluating `status_lines`, never by the exit code alone.
#[derive(Debug)]
pub struct ProcessResult {
    pub stdout: String,
    pub stderr: String,
    pub status_lines: Vec<String>,
    pub exit_code: i32,
}

/// Runs the external OpenPGP tool against one keyring home
#[derive(Debug, Clone)]
pub struct GpgRunner {
    tool: PathBuf,
    keyring_home: PathBuf,
    identity: String,
    status_timeout: Duration,
}

impl GpgRunner {
    pub fn new(config: &EngineConfig) -> Self {
        GpgRunner {
            tool: config.tool.clone(),
            keyring_home: config.keyring_home.clone(),
            identity: config.identity.clone(),
            status_timeout: Duration::from_secs(config.status_timeout_secs),
        }
    }

    /// Flags common to every operation: explicit keyring home, no
    /// interactive prompts, automatic key retrieval, status on fd 3
    fn base_args(&self) -> Vec<String> {
        vec![
            "--homedir".to_string(),
            self.keyring_home.to_string_lossy().into_owned(),
            "--no-permission-warning".to_string(),
            "--no-tty".to_string(),
            "--batch".to_string(),
            "--yes".to_string(),
            "--keyserver-options".to_string(),
            "auto-key-retrieve".to_string(),
            "--status-fd".to_string(),
            STATUS_FD.to_string(),
        ]
    }

    /// Invoke the tool. `input` is written to its stdin and the pipe is
    /// closed afterwards whatever happens.
    pub async fn run(
        &self,
        args: &[&str],
        input: Option<&[u8]>,
    ) -> Result<ProcessResult, VerifyError> {
        let (status_read, status_write) = status_pipe().map_err(|source| {
            VerifyError::ProcessStart {
                tool: self.tool.display().to_string(),
                source,
            }
        })?;

        let mut cmd = Command::new(&self.tool);
        cmd.args(self.base_args())
            .args(args)
            .env_clear()
            .env("PATH", &*SANITIZED_PATH)
            .env("HOME", &self.keyring_home)
            .env("GNUPGHOME", &self.keyring_home)
            .env("USER", &self.identity)
            .env("LOGNAME", &self.identity)
            .env("SHELL", "/bin/sh")
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let write_fd = status_write.as_raw_fd();
        // In the child: move the pipe onto the well-known descriptor. dup2
        // clears close-on-exec on the target, so only fd 3 survives exec.
        // dup2 onto itself is a no-op that would leave close-on-exec set,
        // so that case clears the flag directly.
        unsafe {
            cmd.pre_exec(move || {
                if write_fd == STATUS_FD {
                    let flags = libc::fcntl(STATUS_FD, libc::F_GETFD);
                    if flags == -1
                        || libc::fcntl(STATUS_FD, libc::F_SETFD, flags & !libc::FD_CLOEXEC) == -1
                    {
                        return Err(std::io::Error::last_os_error());
                    }
                } else if libc::dup2(write_fd, STATUS_FD) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        debug!("Invoking {} {:?}", self.tool.display(), args);

        let mut child = cmd.spawn().map_err(|source| VerifyError::ProcessStart {
            tool: self.tool.display().to_string(),
            source,
        })?;

        // The parent's copy must close so EOF can reach the read end
        drop(status_write);

        let collected = tokio::time::timeout(
            self.status_timeout,
            collect_output(&mut child, input, status_read),
        )
        .await;

        let (stdout, stderr, raw_status) = match collected {
            Ok(result) => result.map_err(|e| {
                VerifyError::Protocol(format!("failed reading tool output: {e}"))
            })?,
            Err(_) => {
                // A timed-out invocation must not linger in the background
                let _ = child.start_kill();
                return Err(VerifyError::StatusTimeout {
                    tool: self.tool.display().to_string(),
                    deadline_secs: self.status_timeout.as_secs(),
                });
            }
        };

        let status = child.wait().await.map_err(|e| {
            VerifyError::Protocol(format!("failed waiting for tool exit: {e}"))
        })?;
        let exit_code = status.code().unwrap_or(-1);

        let status_text = String::from_utf8_lossy(&raw_status);
        let mut status_lines: Vec<String> =
            status_text.lines().map(str::to_string).collect();
        while status_lines.last().is_some_and(|l| l.trim().is_empty()) {
            status_lines.pop();
        }

        trace!(
            exit_code,
            status_line_count = status_lines.len(),
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "tool invocation complete"
        );

        Ok(ProcessResult {
            stdout,
            stderr,
            status_lines,
            exit_code,
        })
    }
}

/// Drain the channels in the contract order: stdin written and closed,
/// stdout and stderr to EOF, then the status pipe to completion.
async fn collect_output(
    child: &mut tokio::process::Child,
    input: Option<&[u8]>,
    status_read: std::fs::File,
) -> std::io::Result<(String, String, Vec<u8>)> {
    if let Some(data) = input {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(data).await?;
            stdin.shutdown().await?;
        }
    }

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        std::io::Error::other("stdout channel was not captured")
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        std::io::Error::other("stderr channel was not captured")
    })?;

    let mut stdout = String::new();
    let mut stderr = String::new();
    tokio::try_join!(
        stdout_pipe.read_to_string(&mut stdout),
        stderr_pipe.read_to_string(&mut stderr),
    )?;

    let mut status_file = tokio::fs::File::from_std(status_read);
    let mut raw_status = Vec::new();
    status_file.read_to_end(&mut raw_status).await?;

    Ok((stdout, stderr, raw_status))
}

/// A pipe pair with close-on-exec set on both ends; the child-side
/// descriptor is re-armed by `dup2` in `pre_exec`.
fn status_pipe() -> std::io::Result<(std::fs::File, std::fs::File)> {
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    for fd in fds {
        unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) };
    }
    let read = unsafe { std::fs::File::from_raw_fd(fds[0]) };
    let write = unsafe { std::fs::File::from_raw_fd(fds[1]) };
    Ok((read, write))
}
