//! Reusable test content

/// Two web hosts and a db host, local transport, deploying `app_src/`
pub const FLEET_CONFIG: &str = r#"
application   = "site"
repository    = "app_src"
scm           = "none"
deploy_via    = "copy"
deploy_to     = "/srv/{application}"
transport     = "local"
keep_releases = 3
linked_dirs   = ["storage/logs"]

[roles]
web = ["web1", "web2"]
db  = { hosts = ["db1"], primary = true }

[[hooks]]
after = "deploy:restart"
task  = "deploy:cleanup"
"#;

/// A single host with a restart command
pub fn single_host_config(restart: &str) -> String {
    format!(
        r#"
application     = "site"
repository      = "app_src"
scm             = "none"
deploy_via      = "copy"
deploy_to       = "/srv/site"
transport       = "local"
keep_releases   = 3
restart_command = "{}"

[roles]
web = ["web1"]

[[hooks]]
after = "deploy:restart"
task  = "deploy:cleanup"
"#,
        restart
    )
}

pub const INDEX_HTML: &str = "<h1>hello</h1>\n";
