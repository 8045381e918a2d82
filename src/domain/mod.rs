//! Domain Layer
//!
//! Deploy concepts without I/O.
//!
//! ## Structure
//!
//! - `entities/` - Configuration, TargetRegistry, Release, Hook
//! - `value_objects/` - Host, ReleaseId, Stage, strategies
//! - `services/` - HookPipeline / ExecutionPlan, RetentionPolicy
//! - `ports/` - Remote, SourceFetcher, DeployEventSink
//!
//! ## Design Principles
//!
//! 1. **No I/O** - This layer never touches the file system or network directly
//! 2. **Pure Functions** - Services are stateless and testable
//! 3. **Ports & Adapters** - All I/O goes through trait-defined ports

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
