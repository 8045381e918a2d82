//! Hook entity - a unit of work attached before or after a stage

use std::collections::BTreeSet;

use crate::error::ConfigError;

/// Built-in task that prunes old releases
pub const CLEANUP_TASK: &str = "deploy:cleanup";

/// What a hook does when it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    /// Run the retention pruner
    Cleanup,
    /// Run a shell command on the host, in the release's app root
    Command { run: String, sudo: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    name: String,
    action: HookAction,
    roles: Vec<String>,
}

impl Hook {
    /// Resolve a built-in task by name (`deploy:cleanup` or `cleanup`)
    pub fn task(name: &str) -> Result<Self, ConfigError> {
        let bare = name.trim().strip_prefix("deploy:").unwrap_or(name.trim());
        match bare {
            "cleanup" => Ok(Self {
                name: CLEANUP_TASK.to_string(),
                action: HookAction::Cleanup,
                roles: Vec::new(),
            }),
            _ => Err(ConfigError::UnknownTask(name.to_string())),
        }
    }

    pub fn command(run: impl Into<String>) -> Self {
        let run = run.into();
        Self {
            name: run.clone(),
            action: HookAction::Command { run, sudo: false },
            roles: Vec::new(),
        }
    }

    pub fn with_sudo(mut self, sudo: bool) -> Self {
        if let HookAction::Command { sudo: s, .. } = &mut self.action {
            *s = sudo;
        }
        self
    }

    /// Restrict the hook to hosts in any of `roles` (empty means all hosts)
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &HookAction {
        &self.action
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn applies_to(&self, host_roles: &BTreeSet<String>) -> bool {
        self.roles.is_empty() || self.roles.iter().any(|r| host_roles.contains(r))
    }
}
