//! Test environment builder for isolated Capstan testing.
//!
//! Every host lives under `fleet/<address>/` via `CAPSTAN_LOCAL_ROOT`, so
//! a whole fleet is simulated inside one temp directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

use super::fixtures::INDEX_HTML;

/// Result of running a Capstan CLI command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    /// Combine stdout and stderr
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

pub struct TestEnv {
    pub root: TempDir,
    capstan_bin: PathBuf,
}

impl TestEnv {
    /// Project with `capstan.toml` set to `config` and a small source tree
    pub fn with_config(config: &str) -> Self {
        let env = Self {
            root: tempfile::tempdir().expect("Failed to create temp dir"),
            capstan_bin: PathBuf::from(env!("CARGO_BIN_EXE_capstan")),
        };
        env.write_project_file("capstan.toml", config);
        env.write_project_file("app_src/index.html", INDEX_HTML);
        std::fs::create_dir_all(env.fleet()).expect("Failed to create fleet dir");
        env
    }

    pub fn project(&self) -> PathBuf {
        self.root.path().join("project")
    }

    pub fn fleet(&self) -> PathBuf {
        self.root.path().join("fleet")
    }

    /// Deploy root of `site` on `host`
    pub fn deploy_root(&self, host: &str) -> PathBuf {
        self.fleet().join(host).join("srv/site")
    }

    pub fn write_project_file(&self, relative_path: &str, content: &str) {
        let full_path = self.project().join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
    }

    /// Release directory names on `host`, oldest first
    pub fn releases(&self, host: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.deploy_root(host).join("releases"))
            .map(|entries| {
                entries
                    .flatten()
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Release name `current` points at on `host`
    pub fn current(&self, host: &str) -> Option<String> {
        let target = std::fs::read_link(self.deploy_root(host).join("current")).ok()?;
        target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> TestResult {
        let mut cmd = Command::new(&self.capstan_bin);
        cmd.current_dir(self.project())
            .args(args)
            .env("CAPSTAN_LOCAL_ROOT", self.fleet())
            .env("CAPSTAN_HOME", self.root.path().join("capstan_home"))
            .env("NO_COLOR", "1")
            .env_remove("CAPSTAN_BRANCH")
            .env_remove("CAPSTAN_USER")
            .env_remove("CAPSTAN_KEEP_RELEASES")
            .env_remove("RUST_LOG");

        for (key, value) in env_vars {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("Failed to execute capstan");
        output_to_result(output)
    }
}

fn output_to_result(output: Output) -> TestResult {
    TestResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Read a file relative to `dir`, panicking with the path on failure
pub fn read(dir: &Path, relative: &str) -> String {
    let path = dir.join(relative);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}
