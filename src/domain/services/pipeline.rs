//! Hook pipeline - stage registration and execution planning
//!
//! Hooks are registered against a `Stage` and a `HookSlot`. The pipeline
//! resolves them into a flat `ExecutionPlan` before any host is touched:
//! for each stage in declared order, its before-hooks, its body, then its
//! after-hooks, each slot in registration order.

use std::collections::BTreeSet;

use crate::domain::entities::Hook;
use crate::domain::value_objects::{HookSlot, Stage};
use crate::error::ConfigError;

/// One registered hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookRegistration {
    pub stage: Stage,
    pub slot: HookSlot,
    pub hook: Hook,
}

/// Registered hooks. Append-only: a registration cannot be removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookPipeline {
    registrations: Vec<HookRegistration>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register by stage name; unknown names fail here, not at run time.
    pub fn register(
        &mut self,
        stage_name: &str,
        slot: HookSlot,
        hook: Hook,
    ) -> Result<(), ConfigError> {
        let stage = Stage::from_name(stage_name)
            .ok_or_else(|| ConfigError::UnknownStage(stage_name.to_string()))?;
        self.register_at(stage, slot, hook);
        Ok(())
    }

    pub fn register_at(&mut self, stage: Stage, slot: HookSlot, hook: Hook) {
        self.registrations.push(HookRegistration { stage, slot, hook });
    }

    pub fn registrations(&self) -> &[HookRegistration] {
        &self.registrations
    }

    pub fn plan(&self) -> ExecutionPlan {
        let mut steps = Vec::new();
        for stage in Stage::ALL {
            steps.extend(self.hooks_at(stage, HookSlot::Before));
            steps.push(Step::Body(stage));
            steps.extend(self.hooks_at(stage, HookSlot::After));
        }
        ExecutionPlan { steps }
    }

    fn hooks_at(&self, stage: Stage, slot: HookSlot) -> impl Iterator<Item = Step> + '_ {
        self.registrations
            .iter()
            .filter(move |r| r.stage == stage && r.slot == slot)
            .map(move |r| Step::Hook {
                stage,
                slot,
                hook: r.hook.clone(),
            })
    }
}

/// One unit of the execution plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Body(Stage),
    Hook {
        stage: Stage,
        slot: HookSlot,
        hook: Hook,
    },
}

impl Step {
    /// Human label, e.g. `deploy:restart` or `after deploy:restart: deploy:cleanup`
    pub fn label(&self) -> String {
        match self {
            Step::Body(stage) => stage.name().to_string(),
            Step::Hook { stage, slot, hook } => {
                format!("{} {}: {}", slot, stage.name(), hook.name())
            }
        }
    }
}

/// Ordered steps resolved from a `HookPipeline`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    steps: Vec<Step>,
}

impl ExecutionPlan {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Steps that apply to a host holding `host_roles`. Stage bodies
    /// always apply; hooks may be role-scoped.
    pub fn steps_for<'a>(
        &'a self,
        host_roles: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a Step> + 'a {
        self.steps.iter().filter(move |step| match step {
            Step::Body(_) => true,
            Step::Hook { hook, .. } => hook.applies_to(host_roles),
        })
    }
}
