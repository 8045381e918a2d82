//! Domain Services
//!
//! Pure business logic services that operate on domain entities.
//! These services have no I/O dependencies and are easily testable.

mod pipeline;
mod retention;

pub use pipeline::{ExecutionPlan, HookPipeline, HookRegistration, Step};
pub use retention::{PrunePlan, RetentionPolicy};
