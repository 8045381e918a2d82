//! Output Rendering
//!
//! Text rendering for plans, summaries and release listings, plus the JSON
//! documents printed by `--json` for commands that do not stream events.
//! Renderers return strings; callers decide where they go.

use std::fmt::Write as _;

use crossterm::style::Stylize;
use serde_json::{json, Value};

use crate::application::{DeployReport, HostPlan, HostReleases};
use crate::domain::entities::{Configuration, ReleaseStatus};
use crate::domain::services::Step;

use super::terminal::TerminalCapabilities;

/// Icons for output rendering
struct Icons {
    check: &'static str,
    cross: &'static str,
    warn: &'static str,
    arrow: &'static str,
    bullet: &'static str,
}

impl Icons {
    fn unicode() -> Self {
        Self {
            check: "✓",
            cross: "✗",
            warn: "⚠",
            arrow: "→",
            bullet: "•",
        }
    }

    fn ascii() -> Self {
        Self {
            check: "[OK]",
            cross: "[FAIL]",
            warn: "[WARN]",
            arrow: "->",
            bullet: "-",
        }
    }
}

/// Text renderer for command output
pub struct TextRenderer {
    color: bool,
    icons: Icons,
}

impl TextRenderer {
    pub fn new(caps: TerminalCapabilities) -> Self {
        Self {
            color: caps.supports_color,
            icons: if caps.supports_unicode {
                Icons::unicode()
            } else {
                Icons::ascii()
            },
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn good(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn bad(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dark_grey().to_string()
        } else {
            text.to_string()
        }
    }

    /// `capstan check`: settings, roles and the resolved hook plan
    pub fn render_check(&self, config: &Configuration) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.bold(&config.application));
        let _ = writeln!(out, "  deploy_to   {}", config.deploy_to.display());
        if !config.app_path.as_os_str().is_empty() {
            let _ = writeln!(out, "  app_path    {}", config.app_path.display());
        }
        let _ = writeln!(out, "  repository  {} ({})", config.repository, config.scm);
        let _ = writeln!(out, "  branch      {}", config.branch);
        let _ = writeln!(out, "  deploy_via  {}", config.deploy_via);
        let _ = writeln!(out, "  keep        {}", config.keep_releases);
        if let Some(restart) = &config.restart_command {
            let _ = writeln!(out, "  restart     {}", config.try_sudo(restart));
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.bold("Roles"));
        for role in config.registry.roles() {
            let hosts: Vec<String> = role.hosts().iter().map(|h| h.to_string()).collect();
            let mut line = format!("  {:<10} {}", role.name(), hosts.join(", "));
            if !role.flags().is_empty() {
                let flags: Vec<&str> = role.flags().iter().map(String::as_str).collect();
                line.push_str(&self.dim(&format!(" [{}]", flags.join(", "))));
            }
            let _ = writeln!(out, "{}", line);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.bold("Plan"));
        for step in config.pipeline.plan().steps() {
            let _ = writeln!(out, "  {}", self.step_line(step));
        }
        out
    }

    /// `capstan deploy --dry-run`: the steps each host would run
    pub fn render_plan(&self, plans: &[HostPlan]) -> String {
        let mut out = String::new();
        for (i, plan) in plans.iter().enumerate() {
            if i > 0 {
                let _ = writeln!(out);
            }
            let roles: Vec<&str> = plan.roles.iter().map(String::as_str).collect();
            let _ = writeln!(
                out,
                "{} {}",
                self.bold(&plan.host.to_string()),
                self.dim(&format!("({})", roles.join(", ")))
            );
            for step in &plan.steps {
                let _ = writeln!(out, "  {}", self.step_line(step));
            }
        }
        out
    }

    fn step_line(&self, step: &Step) -> String {
        match step {
            Step::Body(stage) => format!("{} {}", self.icons.bullet, stage.name()),
            Step::Hook { .. } => format!("  {} {}", self.icons.arrow, step.label()),
        }
    }

    /// Closing summary with one line per failed host
    pub fn render_summary(&self, command: &str, report: &DeployReport) -> String {
        let mut out = String::new();
        let total = report.outcomes.len();
        if report.is_success() {
            let _ = writeln!(
                out,
                "{} {} succeeded on {} host{}",
                self.good(self.icons.check),
                command,
                total,
                plural(total)
            );
            return out;
        }

        let _ = writeln!(
            out,
            "{} {} failed on {} of {} host{}",
            self.bad(self.icons.cross),
            command,
            report.failed(),
            total,
            plural(total)
        );
        for (host, error) in report.failures() {
            let _ = writeln!(out, "  {}: {}", self.bold(host.address()), error);
        }
        out
    }

    /// `capstan releases`: one block per host, oldest first
    pub fn render_releases(&self, listing: &[HostReleases]) -> String {
        let mut out = String::new();
        for (i, entry) in listing.iter().enumerate() {
            if i > 0 {
                let _ = writeln!(out);
            }
            let _ = writeln!(out, "{}", self.bold(entry.host.address()));
            match &entry.releases {
                Ok(releases) if releases.is_empty() => {
                    let _ = writeln!(out, "  {}", self.dim("no releases"));
                }
                Ok(releases) => {
                    for release in releases {
                        let status = release.status().to_string();
                        let status = match release.status() {
                            ReleaseStatus::Active => self.good(&status),
                            ReleaseStatus::Failed => self.bad(&status),
                            ReleaseStatus::Pending | ReleaseStatus::Superseded => self.dim(&status),
                        };
                        let _ = writeln!(out, "  {}  {}", release.id(), status);
                    }
                }
                Err(e) => {
                    let _ = writeln!(out, "  {} {}", self.bad(self.icons.warn), e);
                }
            }
        }
        out
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn step_json(step: &Step) -> Value {
    match step {
        Step::Body(stage) => json!({ "stage": stage.name(), "kind": "body" }),
        Step::Hook { stage, slot, hook } => json!({
            "stage": stage.name(),
            "kind": "hook",
            "slot": slot,
            "hook": hook.name(),
        }),
    }
}

pub fn plan_json(plans: &[HostPlan]) -> Value {
    let hosts: Vec<Value> = plans
        .iter()
        .map(|plan| {
            json!({
                "host": plan.host.address(),
                "roles": plan.roles,
                "steps": plan.steps.iter().map(step_json).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({ "event": "plan", "hosts": hosts })
}

pub fn check_json(config: &Configuration) -> Value {
    let roles: Vec<Value> = config
        .registry
        .roles()
        .map(|role| {
            json!({
                "name": role.name(),
                "hosts": role.hosts().iter().map(|h| h.to_string()).collect::<Vec<_>>(),
                "flags": role.flags(),
            })
        })
        .collect();
    json!({
        "event": "check",
        "application": config.application,
        "deploy_to": config.deploy_to,
        "branch": config.branch,
        "deploy_via": config.deploy_via,
        "keep_releases": config.keep_releases.get(),
        "roles": roles,
        "steps": config.pipeline.plan().steps().iter().map(step_json).collect::<Vec<_>>(),
    })
}

pub fn releases_json(listing: &[HostReleases]) -> Value {
    let hosts: Vec<Value> = listing
        .iter()
        .map(|entry| match &entry.releases {
            Ok(releases) => json!({
                "host": entry.host.address(),
                "releases": releases
                    .iter()
                    .map(|r| json!({ "id": r.id(), "status": r.status() }))
                    .collect::<Vec<_>>(),
            }),
            Err(e) => json!({
                "host": entry.host.address(),
                "error": e.to_string(),
            }),
        })
        .collect();
    json!({ "event": "releases", "hosts": hosts })
}
