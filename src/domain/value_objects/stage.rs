//! Pipeline stage value objects

use serde::Serialize;

/// A named lifecycle stage of a deploy, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Prepare the deploy root
    Start,
    /// Fetch the source and create the pending release
    UpdateCode,
    /// Atomically point `current` at the new release
    Symlink,
    /// Restart the application
    Restart,
    /// Record the deploy
    Finished,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 5] = [
        Stage::Start,
        Stage::UpdateCode,
        Stage::Symlink,
        Stage::Restart,
        Stage::Finished,
    ];

    /// Qualified name, e.g. `deploy:restart`
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Start => "deploy:start",
            Stage::UpdateCode => "deploy:update_code",
            Stage::Symlink => "deploy:symlink",
            Stage::Restart => "deploy:restart",
            Stage::Finished => "deploy:finished",
        }
    }

    /// Look up a stage by qualified (`deploy:restart`) or bare (`restart`) name
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name.trim().strip_prefix("deploy:").unwrap_or(name.trim());
        match bare {
            "start" => Some(Stage::Start),
            "update_code" => Some(Stage::UpdateCode),
            "symlink" => Some(Stage::Symlink),
            "restart" => Some(Stage::Restart),
            "finished" => Some(Stage::Finished),
            _ => None,
        }
    }

    /// Stages at or after this one run with the new release promoted
    pub fn is_post_publish(&self) -> bool {
        *self > Stage::Symlink
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a hook attaches relative to its stage body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookSlot {
    Before,
    After,
}

impl std::fmt::Display for HookSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookSlot::Before => write!(f, "before"),
            HookSlot::After => write!(f, "after"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_matches_declaration() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
    }

    #[test]
    fn stage_from_name_accepts_both_forms() {
        assert_eq!(Stage::from_name("deploy:restart"), Some(Stage::Restart));
        assert_eq!(Stage::from_name("restart"), Some(Stage::Restart));
        assert_eq!(Stage::from_name("deploy:update_code"), Some(Stage::UpdateCode));
        assert_eq!(Stage::from_name("deploy:cleanup"), None);
        assert_eq!(Stage::from_name("restrat"), None);
    }

    #[test]
    fn stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_name(stage.name()), Some(stage));
        }
    }

    #[test]
    fn only_restart_and_finished_are_post_publish() {
        assert!(!Stage::Symlink.is_post_publish());
        assert!(Stage::Restart.is_post_publish());
        assert!(Stage::Finished.is_post_publish());
    }
}
