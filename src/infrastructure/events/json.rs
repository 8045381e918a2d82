//! JSON Event Sink
//!
//! Outputs deploy events as NDJSON for CI/automation consumption.

use crate::domain::ports::{DeployEvent, DeployEventSink};
use std::io::{self, Write};
use std::sync::Mutex;

/// Event sink that outputs NDJSON events to stdout
pub struct JsonEventSink {
    command: String,
    /// Mutex to ensure thread-safe writes
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonEventSink {
    /// Create a new JSON event sink writing to stdout
    pub fn stdout(command: impl Into<String>) -> Self {
        Self::with_writer(command, io::stdout())
    }

    /// Create a JSON event sink writing to a custom writer
    pub fn with_writer<W: Write + Send + 'static>(command: impl Into<String>, writer: W) -> Self {
        Self {
            command: command.into(),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    fn write_event(&self, event: serde_json::Value) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", event);
            let _ = writer.flush();
        }
    }
}

impl DeployEventSink for JsonEventSink {
    fn on_event(&self, event: DeployEvent) {
        let command = self.command.as_str();
        let json = match event {
            DeployEvent::RunStarted {
                command: _,
                application,
                branch,
                hosts,
            } => {
                serde_json::json!({
                    "event": "start",
                    "command": command,
                    "application": application,
                    "branch": branch,
                    "hosts": hosts,
                })
            }

            DeployEvent::HostStarted { host } => {
                serde_json::json!({
                    "event": "host_start",
                    "command": command,
                    "host": host,
                })
            }

            DeployEvent::StepStarted { host, step } => {
                serde_json::json!({
                    "event": "step_start",
                    "command": command,
                    "host": host,
                    "step": step,
                })
            }

            DeployEvent::StepSkipped { host, step, reason } => {
                serde_json::json!({
                    "event": "step_skipped",
                    "command": command,
                    "host": host,
                    "step": step,
                    "reason": reason,
                })
            }

            DeployEvent::ReleaseCreated { host, release } => {
                serde_json::json!({
                    "event": "release_created",
                    "command": command,
                    "host": host,
                    "release": release,
                })
            }

            DeployEvent::Promoted {
                host,
                release,
                previous,
            } => {
                serde_json::json!({
                    "event": "promoted",
                    "command": command,
                    "host": host,
                    "release": release,
                    "previous": previous,
                })
            }

            DeployEvent::RolledBack { host, restored } => {
                serde_json::json!({
                    "event": "rolled_back",
                    "command": command,
                    "host": host,
                    "restored": restored,
                })
            }

            DeployEvent::ReleaseDeleted { host, release } => {
                serde_json::json!({
                    "event": "release_deleted",
                    "command": command,
                    "host": host,
                    "release": release,
                })
            }

            DeployEvent::Warning { host, message } => {
                serde_json::json!({
                    "event": "warning",
                    "command": command,
                    "host": host,
                    "message": message,
                })
            }

            DeployEvent::HostFinished {
                host,
                success,
                error,
            } => {
                serde_json::json!({
                    "event": "host_complete",
                    "command": command,
                    "host": host,
                    "status": if success { "success" } else { "failed" },
                    "error": error,
                })
            }

            DeployEvent::Completed { succeeded, failed } => {
                let status = if failed == 0 { "success" } else { "partial" };
                serde_json::json!({
                    "event": "complete",
                    "command": command,
                    "status": status,
                    "succeeded": succeeded,
                    "failed": failed,
                })
            }
        };

        self.write_event(json);
    }
}
