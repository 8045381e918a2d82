//! Common test utilities for Capstan CLI tests.
//!
//! This module provides:
//! - `TestEnv`: a project directory plus a sandbox standing in for the
//!   fleet, with helpers to run the capstan binary against it
//! - Fixtures: reusable configuration and source content

#![allow(dead_code)]

pub mod env;
pub mod fixtures;

pub use env::*;
pub use fixtures::*;
