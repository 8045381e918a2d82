//! Deploy Use Case Tests
//!
//! Hosts are sandboxed `LocalRemote`s under one temp directory, so every
//! test exercises the real release layout on disk.

use super::*;
use crate::application::release_manager::ReleaseManager;
use crate::application::targets::TargetFilter;
use crate::config::{parse_with_warnings, ConfigOverrides};
use crate::domain::entities::{Configuration, DeployPaths, ReleaseStatus};
use crate::domain::ports::deploy_events::tests::RecordingEventSink;
use crate::domain::ports::{
    Connector, DeployEvent, FetchError, Remote, SourceFetcher, SourceTree,
};
use crate::domain::value_objects::{CancelFlag, Host, ReleaseId};
use crate::error::DeployError;
use crate::infrastructure::command::CommandRunner;
use crate::infrastructure::remote::LocalConnector;
use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

// Mock implementations for testing

struct StubFetcher {
    calls: Arc<AtomicUsize>,
    fail_on: Option<String>,
}

impl SourceFetcher for StubFetcher {
    fn fetch(&self, remote: &dyn Remote, release_path: &Path) -> Result<SourceTree, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.as_deref() == Some(remote.host().address()) {
            return Err(FetchError::UnknownBranch("develop".to_string()));
        }
        remote.write_file(&release_path.join("index.html"), "<h1>site</h1>")?;
        remote.write_file(&release_path.join("app/console"), "#!/bin/sh")?;
        Ok(SourceTree {
            revision: "abc123".to_string(),
        })
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

struct Fixture {
    dir: TempDir,
    config: Configuration,
    calls: Arc<AtomicUsize>,
    cancel: CancelFlag,
}

const HEADER: &str = r#"
application   = "site"
repository    = "."
scm           = "none"
deploy_via    = "copy"
deploy_to     = "/srv/site"
transport     = "local"
keep_releases = 3
"#;

const CLEANUP_HOOK: &str = r#"
[[hooks]]
after = "deploy:restart"
task  = "deploy:cleanup"
"#;

fn fixture(settings: &str, roles_and_hooks: &str) -> Fixture {
    let content = format!("{}{}\n{}", HEADER, settings, roles_and_hooks);
    let (config, warnings) =
        parse_with_warnings(&content, Path::new("capstan.toml"), &ConfigOverrides::default())
            .unwrap();
    assert!(warnings.is_empty(), "{:?}", warnings);
    Fixture {
        dir: tempdir().unwrap(),
        config,
        calls: Arc::new(AtomicUsize::new(0)),
        cancel: CancelFlag::new(),
    }
}

fn single_host(settings: &str) -> Fixture {
    fixture(
        settings,
        &format!("[roles]\nweb = [\"web1\"]\n{}", CLEANUP_HOOK),
    )
}

impl Fixture {
    fn runner(&self) -> CommandRunner {
        CommandRunner::new(Duration::from_secs(10), self.cancel.clone())
    }

    fn connector(&self) -> LocalConnector {
        LocalConnector::new(Some(self.dir.path().to_path_buf()), self.runner())
    }

    fn use_case(&self, fail_on: Option<&str>) -> DeployUseCase<'_> {
        DeployUseCase::new(
            &self.config,
            Box::new(self.connector()),
            Box::new(StubFetcher {
                calls: self.calls.clone(),
                fail_on: fail_on.map(str::to_string),
            }),
            self.cancel.clone(),
        )
    }

    fn remote(&self, host: &str) -> Box<dyn Remote> {
        self.connector().connect(&Host::new(host))
    }

    /// Deployed releases on `host`, oldest first
    fn releases(&self, host: &str) -> Vec<(String, ReleaseStatus)> {
        let remote = self.remote(host);
        let manager = ReleaseManager::new(remote.as_ref(), DeployPaths::new("/srv/site"));
        manager
            .list()
            .unwrap()
            .into_iter()
            .map(|r| (r.id().to_string(), r.status()))
            .collect()
    }

    /// Seed `host` with promoted releases at the given seconds past 2024-01-01
    fn seed(&self, host: &str, seconds: &[u32]) -> Vec<ReleaseId> {
        let remote = self.remote(host);
        let manager = ReleaseManager::new(remote.as_ref(), DeployPaths::new("/srv/site"));
        manager.setup(&[], &[]).unwrap();
        seconds
            .iter()
            .map(|s| {
                let release = manager.create_release(at(*s)).unwrap();
                manager.promote(release.id()).unwrap();
                release.id().clone()
            })
            .collect()
    }

    fn host_path(&self, host: &str, path: &str) -> PathBuf {
        self.dir.path().join(host).join(path.trim_start_matches('/'))
    }
}

fn at(seconds: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, seconds).unwrap()
}

fn options() -> DeployOptions {
    DeployOptions::new().with_release_time(at(50))
}

#[test]
fn test_deploy_promotes_new_release() {
    let f = single_host("");
    let report = f.use_case(None).execute(&options()).unwrap();

    assert!(report.is_success(), "{:?}", report);
    let outcome = report.outcome("web1").unwrap();
    assert_eq!(outcome.release.as_ref().unwrap().as_str(), "20240101000050");
    assert_eq!(outcome.previous, None);
    assert_eq!(outcome.revision.as_deref(), Some("abc123"));

    assert_eq!(
        f.releases("web1"),
        vec![("20240101000050".to_string(), ReleaseStatus::Active)]
    );
    let current = f.host_path("web1", "/srv/site/current");
    assert_eq!(
        fs::read_to_string(current.join("index.html")).unwrap(),
        "<h1>site</h1>"
    );
    assert_eq!(
        fs::read_to_string(current.join("REVISION")).unwrap(),
        "abc123\n"
    );
    let log = fs::read_to_string(f.host_path("web1", "/srv/site/revisions.log")).unwrap();
    assert!(log.contains("Branch master (at abc123) deployed as release 20240101000050"));
}

#[test]
fn test_deploy_prunes_to_keep_releases() {
    // keep_releases = 3, r1..r3 with r3 active, deploy r4 -> {r2, r3, r4}
    let f = single_host("");
    let seeded = f.seed("web1", &[1, 2, 3]);

    let report = f.use_case(None).execute(&options()).unwrap();

    assert!(report.is_success());
    let outcome = report.outcome("web1").unwrap();
    assert_eq!(outcome.previous.as_ref(), Some(&seeded[2]));
    assert_eq!(outcome.deleted, vec![seeded[0].clone()]);
    assert_eq!(
        f.releases("web1"),
        vec![
            ("20240101000002".to_string(), ReleaseStatus::Superseded),
            ("20240101000003".to_string(), ReleaseStatus::Superseded),
            ("20240101000050".to_string(), ReleaseStatus::Active),
        ]
    );
}

#[test]
fn test_restart_failure_keeps_previous_release() {
    let f = single_host("restart_command = \"exit 3\"");
    f.seed("web1", &[1, 2, 3]);
    let sink = RecordingEventSink::default();

    let report = f
        .use_case(None)
        .execute_with_events(&options(), Arc::new(sink.clone()))
        .unwrap();

    assert!(!report.is_success());
    let outcome = report.outcome("web1").unwrap();
    assert!(matches!(outcome.error, Some(DeployError::Restart(_))));
    // Cleanup never ran: nothing pruned, r4 left behind as failed
    assert!(outcome.deleted.is_empty());
    assert_eq!(
        f.releases("web1"),
        vec![
            ("20240101000001".to_string(), ReleaseStatus::Superseded),
            ("20240101000002".to_string(), ReleaseStatus::Superseded),
            ("20240101000003".to_string(), ReleaseStatus::Active),
            ("20240101000050".to_string(), ReleaseStatus::Failed),
        ]
    );
    assert!(sink.events().contains(&DeployEvent::RolledBack {
        host: "web1".to_string(),
        restored: Some("20240101000003".to_string()),
    }));
}

#[test]
fn test_first_deploy_failure_after_promotion_removes_current() {
    let f = single_host("restart_command = \"false\"");

    let report = f.use_case(None).execute(&options()).unwrap();

    assert!(!report.is_success());
    assert!(!f.host_path("web1", "/srv/site/current").exists());
    assert_eq!(
        f.releases("web1"),
        vec![("20240101000050".to_string(), ReleaseStatus::Failed)]
    );
}

#[test]
fn test_restart_runs_in_current_app_root() {
    let f = single_host("app_path = \"app\"\nrestart_command = \"touch restarted\"");

    let report = f.use_case(None).execute(&options()).unwrap();

    assert!(report.is_success(), "{:?}", report);
    assert!(f
        .host_path("web1", "/srv/site/releases/20240101000050/app/restarted")
        .exists());
}

#[test]
fn test_fetch_failure_leaves_current_untouched() {
    let f = single_host("");
    let seeded = f.seed("web1", &[1]);

    let report = f.use_case(Some("web1")).execute(&options()).unwrap();

    let outcome = report.outcome("web1").unwrap();
    assert!(matches!(
        outcome.error,
        Some(DeployError::Fetch(FetchError::UnknownBranch(_)))
    ));
    let releases = f.releases("web1");
    assert_eq!(releases[0], (seeded[0].to_string(), ReleaseStatus::Active));
    assert_eq!(releases[1].1, ReleaseStatus::Failed);
}

#[test]
fn test_failing_hook_halts_and_is_named() {
    let f = fixture(
        "",
        r#"
[roles]
web = ["web1"]

[[hooks]]
before = "deploy:symlink"
run    = "exit 7"

[[hooks]]
after = "deploy:restart"
task  = "deploy:cleanup"
"#,
    );
    f.seed("web1", &[1, 2, 3, 4]);

    let report = f.use_case(None).execute(&options()).unwrap();

    match &report.outcome("web1").unwrap().error {
        Some(DeployError::Hook { hook, .. }) => {
            assert_eq!(hook, "before deploy:symlink: exit 7")
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    // Failed before promotion: current untouched, nothing pruned
    let releases = f.releases("web1");
    assert_eq!(releases.len(), 5);
    assert_eq!(releases[3].1, ReleaseStatus::Active);
    assert_eq!(releases[4].1, ReleaseStatus::Failed);
}

#[test]
fn test_after_restart_hook_failure_restores_current() {
    let f = fixture(
        "restart_command = \"true\"",
        r#"
[roles]
web = ["web1"]

[[hooks]]
after = "deploy:restart"
run   = "exit 1"

[[hooks]]
after = "deploy:restart"
task  = "deploy:cleanup"
"#,
    );
    let seeded = f.seed("web1", &[1]);

    let report = f.use_case(None).execute(&options()).unwrap();

    assert!(matches!(
        report.outcome("web1").unwrap().error,
        Some(DeployError::Hook { .. })
    ));
    let releases = f.releases("web1");
    assert_eq!(releases[0], (seeded[0].to_string(), ReleaseStatus::Active));
    assert_eq!(releases[1].1, ReleaseStatus::Failed);
}

#[test]
fn test_host_in_many_roles_deploys_once() {
    let f = fixture("", "[roles]\nweb = [\"web1\"]\ndb = [\"web1\"]\n");

    let report = f.use_case(None).execute(&options()).unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(f.calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.releases("web1").len(), 1);
}

#[test]
fn test_failure_is_isolated_to_its_host() {
    let f = fixture("", "[roles]\nweb = [\"web1\", \"web2\"]\n");

    let report = f.use_case(Some("web2")).execute(&options()).unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert!(report.outcome("web1").unwrap().is_success());
    assert_eq!(f.releases("web1")[0].1, ReleaseStatus::Active);
    assert_eq!(f.releases("web2")[0].1, ReleaseStatus::Failed);
}

#[test]
fn test_role_scoped_hook_runs_only_on_its_role() {
    let f = fixture(
        "",
        r#"
[roles]
web = ["web1"]
db  = ["db1"]

[[hooks]]
after = "deploy:symlink"
run   = "touch warmed"
roles = ["web"]
"#,
    );

    let report = f.use_case(None).execute(&options()).unwrap();

    assert!(report.is_success(), "{:?}", report);
    assert!(f.host_path("web1", "/srv/site/current/warmed").exists());
    assert!(!f.host_path("db1", "/srv/site/current/warmed").exists());
}

#[test]
fn test_held_lock_fails_the_host_without_changes() {
    let f = single_host("");
    let holder = f.remote("web1");
    holder.create_dir_all(Path::new("/srv/site")).unwrap();
    holder
        .try_lock(Path::new("/srv/site/.capstan.lock"), "someone else")
        .unwrap();

    let report = f.use_case(None).execute(&options()).unwrap();

    assert!(matches!(
        report.outcome("web1").unwrap().error,
        Some(DeployError::Lock(_))
    ));
    assert!(f.releases("web1").is_empty());
}

#[test]
fn test_cancelled_run_stops_before_first_step() {
    let f = single_host("");
    f.cancel.cancel();

    let report = f.use_case(None).execute(&options()).unwrap();

    assert!(matches!(
        report.outcome("web1").unwrap().error,
        Some(DeployError::Interrupted)
    ));
    assert_eq!(f.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_events_follow_the_run() {
    let f = single_host("");
    let sink = RecordingEventSink::default();

    f.use_case(None)
        .execute_with_events(&options(), Arc::new(sink.clone()))
        .unwrap();

    let events = sink.events();
    assert!(matches!(events.first(), Some(DeployEvent::RunStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(DeployEvent::Completed {
            succeeded: 1,
            failed: 0
        })
    ));
    assert!(events.contains(&DeployEvent::StepSkipped {
        host: "web1".to_string(),
        step: "deploy:restart".to_string(),
        reason: "no restart_command configured".to_string(),
    }));
}

#[test]
fn test_plan_touches_nothing() {
    let f = fixture("", "[roles]\nweb = [\"web1\", \"web2\"]\n");

    let plans = f
        .use_case(None)
        .plan(&DeployOptions::new().with_targets(
            TargetFilter::new().with_hosts(vec!["web2".to_string()]),
        ))
        .unwrap();

    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].host.address(), "web2");
    assert_eq!(plans[0].steps.len(), 5);
    assert_eq!(fs::read_dir(f.dir.path()).unwrap().count(), 0);
}
