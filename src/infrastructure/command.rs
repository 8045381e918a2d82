//! Command runner
//!
//! Runs one child process to completion with:
//! - a hard timeout (the child is killed when it expires)
//! - cancellation (the child is killed when the `CancelFlag` is set)
//! - stdout/stderr captured separately
//!
//! Cancellation only kills work that was started before the flag was set.
//! Commands spawned afterwards are compensation (restoring `current`,
//! releasing locks) and run to completion under the timeout alone.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::domain::ports::{RemoteError, RemoteResult};
use crate::domain::value_objects::CancelFlag;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
    cancel: CancelFlag,
}

impl CommandRunner {
    pub fn new(timeout: Duration, cancel: CancelFlag) -> Self {
        Self { timeout, cancel }
    }

    /// Run `command`, feeding `input` on stdin. Returns trimmed stdout on a
    /// zero exit, `CommandFailed` otherwise.
    pub fn run(&self, command: &mut Command, input: Option<&[u8]>) -> RemoteResult<String> {
        let stdout = self.run_bytes(command, input)?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    /// Like `run`, but returns stdout untouched (archives, binary data)
    pub fn run_bytes(&self, command: &mut Command, input: Option<&[u8]>) -> RemoteResult<Vec<u8>> {
        let program = command.get_program().to_string_lossy().into_owned();
        let interruptible = !self.cancel.is_cancelled();

        command
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::trace!(program = %program, args = ?command.get_args().collect::<Vec<_>>(), "spawn");
        let mut child = command.spawn()?;

        let writer = match (child.stdin.take(), input) {
            (Some(mut stdin), Some(input)) => {
                let input = input.to_vec();
                Some(thread::spawn(move || {
                    // The child may exit without reading everything.
                    let _ = stdin.write_all(&input);
                }))
            }
            _ => None,
        };
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = self.wait(&mut child, interruptible, &program)?;

        if let Some(writer) = writer {
            let _ = writer.join();
        }
        let stdout = join_reader(stdout);
        let stderr = join_reader(stderr);

        if status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            let message = if stderr.is_empty() {
                String::from_utf8_lossy(&stdout).trim().to_string()
            } else {
                stderr
            };
            Err(RemoteError::CommandFailed {
                code: status.code().unwrap_or(-1),
                stderr: message,
            })
        }
    }

    fn wait(&self, child: &mut Child, interruptible: bool, program: &str) -> RemoteResult<ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if interruptible && self.cancel.is_cancelled() {
                tracing::warn!(program, "interrupted, killing child process");
                kill(child);
                return Err(RemoteError::Interrupted);
            }
            if Instant::now() >= deadline {
                tracing::error!(program, timeout = ?self.timeout, "command timed out");
                kill(child);
                return Err(RemoteError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
