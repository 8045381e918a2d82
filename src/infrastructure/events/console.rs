//! Console Event Sink
//!
//! Human-readable progress lines. Every line is prefixed with its host
//! because hosts run concurrently and their lines interleave.

use std::io::{self, Write};
use std::sync::Mutex;

use crossterm::style::Stylize;

use crate::domain::ports::{DeployEvent, DeployEventSink};

pub struct ConsoleEventSink {
    color: bool,
    unicode: bool,
    verbose: bool,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleEventSink {
    pub fn stdout(color: bool, unicode: bool, verbose: bool) -> Self {
        Self::with_writer(io::stdout(), color, unicode, verbose)
    }

    pub fn with_writer<W: Write + Send + 'static>(
        writer: W,
        color: bool,
        unicode: bool,
        verbose: bool,
    ) -> Self {
        Self {
            color,
            unicode,
            verbose,
            writer: Mutex::new(Box::new(writer)),
        }
    }

    fn icon(&self, kind: Mark) -> String {
        let glyph = match (self.unicode, kind) {
            (true, Mark::Ok) => "✓",
            (true, Mark::Fail) => "✗",
            (true, Mark::Warn) => "⚠",
            (true, Mark::Step) => "●",
            (true, Mark::Skip) => "○",
            (false, Mark::Ok) => "[OK]",
            (false, Mark::Fail) => "[FAIL]",
            (false, Mark::Warn) => "[WARN]",
            (false, Mark::Step) => "*",
            (false, Mark::Skip) => "-",
        };
        if !self.color {
            return glyph.to_string();
        }
        match kind {
            Mark::Ok => glyph.green().to_string(),
            Mark::Fail => glyph.red().to_string(),
            Mark::Warn => glyph.yellow().to_string(),
            Mark::Step => glyph.cyan().to_string(),
            Mark::Skip => glyph.dark_grey().to_string(),
        }
    }

    fn host(&self, host: &str) -> String {
        let tag = format!("[{}]", host);
        if self.color {
            tag.bold().to_string()
        } else {
            tag
        }
    }

    fn line(&self, text: String) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", text);
            let _ = writer.flush();
        }
    }
}

#[derive(Clone, Copy)]
enum Mark {
    Ok,
    Fail,
    Warn,
    Step,
    Skip,
}

impl DeployEventSink for ConsoleEventSink {
    fn on_event(&self, event: DeployEvent) {
        let text = match event {
            DeployEvent::RunStarted {
                command,
                application,
                branch,
                hosts,
            } => format!(
                "capstan {} {} ({}) on {} host{}",
                command,
                application,
                branch,
                hosts.len(),
                if hosts.len() == 1 { "" } else { "s" }
            ),
            DeployEvent::HostStarted { .. } => return,
            DeployEvent::StepStarted { host, step } => {
                if !self.verbose {
                    return;
                }
                format!("{} {} {}", self.host(&host), self.icon(Mark::Step), step)
            }
            DeployEvent::StepSkipped { host, step, reason } => {
                if !self.verbose {
                    return;
                }
                format!(
                    "{} {} {} ({})",
                    self.host(&host),
                    self.icon(Mark::Skip),
                    step,
                    reason
                )
            }
            DeployEvent::ReleaseCreated { host, release } => format!(
                "{} {} created release {}",
                self.host(&host),
                self.icon(Mark::Step),
                release
            ),
            DeployEvent::Promoted {
                host,
                release,
                previous,
            } => format!(
                "{} {} current -> {}{}",
                self.host(&host),
                self.icon(Mark::Ok),
                release,
                previous
                    .map(|p| format!(" (was {})", p))
                    .unwrap_or_default()
            ),
            DeployEvent::RolledBack { host, restored } => format!(
                "{} {} restored current -> {}",
                self.host(&host),
                self.icon(Mark::Warn),
                restored.as_deref().unwrap_or("(none)")
            ),
            DeployEvent::ReleaseDeleted { host, release } => format!(
                "{} {} removed release {}",
                self.host(&host),
                self.icon(Mark::Skip),
                release
            ),
            DeployEvent::Warning { host, message } => format!(
                "{} {} {}",
                self.host(&host),
                self.icon(Mark::Warn),
                message
            ),
            DeployEvent::HostFinished {
                host,
                success,
                error,
            } => match (success, error) {
                (true, _) => format!("{} {} done", self.host(&host), self.icon(Mark::Ok)),
                (false, error) => format!(
                    "{} {} {}",
                    self.host(&host),
                    self.icon(Mark::Fail),
                    error.unwrap_or_else(|| "failed".to_string())
                ),
            },
            // The summary is rendered by the command
            DeployEvent::Completed { .. } => return,
        };
        self.line(text);
    }

    fn wants_detailed_events(&self) -> bool {
        self.verbose
    }
}
