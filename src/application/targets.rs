//! Host selection from `--roles` / `--hosts`

use std::collections::BTreeSet;

use crate::domain::entities::TargetRegistry;
use crate::domain::value_objects::Host;
use crate::error::{CapstanError, CapstanResult};

/// Which part of the fleet a command acts on. Empty lists select
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    pub roles: Vec<String>,
    pub hosts: Vec<String>,
}

impl TargetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = hosts;
        self
    }
}

/// Resolve a filter to distinct hosts, sorted by address. Fails before
/// any host is contacted when a role or host is unknown.
pub fn select_hosts(registry: &TargetRegistry, filter: &TargetFilter) -> CapstanResult<Vec<Host>> {
    let mut hosts = registry.hosts_for_roles(&filter.roles)?;

    if !filter.hosts.is_empty() {
        let known: BTreeSet<&str> = registry
            .roles()
            .flat_map(|role| role.hosts().iter().map(Host::address))
            .collect();
        let mut wanted = BTreeSet::new();
        for spec in &filter.hosts {
            let address = Host::parse(spec)
                .map(|h| h.address().to_string())
                .unwrap_or_else(|_| spec.clone());
            if !known.contains(address.as_str()) {
                return Err(CapstanError::UnknownHost(spec.clone()));
            }
            wanted.insert(address);
        }
        hosts.retain(|host| wanted.contains(host.address()));
    }

    if hosts.is_empty() {
        return Err(CapstanError::NoHosts);
    }
    Ok(hosts)
}
