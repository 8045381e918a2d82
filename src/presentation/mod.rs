//! Presentation Layer
//!
//! This layer handles:
//! - CLI argument parsing (via clap)
//! - Creating use cases with infrastructure dependencies
//! - Output formatting (text/JSON)
//!
//! ## Structure
//!
//! - `cli` - Command line definition
//! - `factory` - Creates use cases with proper dependencies (dependency injection)
//! - `output` - Plan, summary and release rendering
//! - `terminal` - Colour and unicode capability detection
//!
//! ## Usage
//!
//! ```ignore
//! use capstan::presentation::factory;
//!
//! // Create deploy use case with all dependencies wired up
//! let use_case = factory::create_deploy_use_case(&config, config_path, cancel);
//! let report = use_case.execute(&options)?;
//! ```

pub mod cli;
pub mod factory;
pub mod output;
pub mod terminal;

pub use cli::{Cli, ColorWhen, Commands};
pub use factory::create_deploy_use_case;
pub use output::TextRenderer;
pub use terminal::{detect_capabilities, TerminalCapabilities};
