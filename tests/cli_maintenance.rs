//! setup, cleanup, releases and rollback

mod common;

use common::*;

#[test]
fn test_setup_creates_layout() {
    let env = TestEnv::with_config(FLEET_CONFIG);

    let result = env.run(&["setup"]);

    assert!(result.success, "{}", result.combined_output());
    for host in ["db1", "web1", "web2"] {
        let root = env.deploy_root(host);
        assert!(root.join("releases").is_dir());
        assert!(root.join("shared/storage/logs").is_dir());
    }
}

#[test]
fn test_releases_lists_statuses() {
    let env = TestEnv::with_config(FLEET_CONFIG);
    assert!(env.run(&["deploy", "--hosts", "web1"]).success);
    assert!(env.run(&["deploy", "--hosts", "web1"]).success);

    let result = env.run(&["releases", "--hosts", "web1,web2"]);

    assert!(result.success, "{}", result.combined_output());
    let releases = env.releases("web1");
    assert!(result.stdout.contains(&format!("{}  superseded", releases[0])));
    assert!(result.stdout.contains(&format!("{}  active", releases[1])));
    assert!(result.stdout.contains("web2\n  no releases"));
}

#[test]
fn test_cleanup_with_lower_keep_from_env() {
    let env = TestEnv::with_config(FLEET_CONFIG);
    for _ in 0..3 {
        assert!(env.run(&["deploy", "--hosts", "web1"]).success);
    }

    let result = env.run_with_env(
        &["cleanup", "--hosts", "web1"],
        &[("CAPSTAN_KEEP_RELEASES", "1")],
    );

    assert!(result.success, "{}", result.combined_output());
    let releases = env.releases("web1");
    assert_eq!(releases.len(), 1);
    assert_eq!(env.current("web1").as_deref(), Some(releases[0].as_str()));
}

#[test]
fn test_rollback_restores_previous_release() {
    let env = TestEnv::with_config(&single_host_config("true"));
    assert!(env.run(&["deploy"]).success);
    assert!(env.run(&["deploy"]).success);
    let releases = env.releases("web1");

    let result = env.run(&["rollback", "--yes"]);

    assert!(result.success, "{}", result.combined_output());
    assert_eq!(env.current("web1").as_deref(), Some(releases[0].as_str()));
    assert_eq!(env.releases("web1"), vec![releases[0].clone()]);
    let log = read(&env.deploy_root("web1"), "revisions.log");
    assert!(log.contains(&format!("rolled back to release {}", releases[0])));
}

#[test]
fn test_rollback_without_previous_release_fails() {
    let env = TestEnv::with_config(&single_host_config("true"));
    assert!(env.run(&["deploy"]).success);

    let result = env.run(&["rollback", "--yes"]);

    assert_eq!(result.exit_code, 1, "{}", result.combined_output());
    assert!(result.stdout.contains("rollback failed on 1 of 1 host"));
    assert_eq!(env.releases("web1").len(), 1);
}
