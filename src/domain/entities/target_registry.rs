//! Target registry - roles and the hosts that fill them
//!
//! Role membership is many-to-many. The registry keeps both directions
//! (role → hosts, host → roles) so neither lookup walks the other.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::value_objects::Host;
use crate::error::{CapstanError, ConfigError};

/// Flag name for the `primary = true` shorthand
pub const PRIMARY_FLAG: &str = "primary";

/// A named group of hosts sharing a responsibility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    name: String,
    hosts: BTreeSet<Host>,
    flags: BTreeSet<String>,
}

impl Role {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hosts(&self) -> &BTreeSet<Host> {
        &self.hosts
    }

    pub fn flags(&self) -> &BTreeSet<String> {
        &self.flags
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRegistry {
    roles: BTreeMap<String, Role>,
    host_roles: BTreeMap<Host, BTreeSet<String>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role. Re-registering a name extends the existing role.
    pub fn add_role(
        &mut self,
        name: impl Into<String>,
        hosts: impl IntoIterator<Item = Host>,
        flags: impl IntoIterator<Item = String>,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        let hosts: Vec<Host> = hosts.into_iter().collect();
        if hosts.is_empty() {
            return Err(ConfigError::EmptyRole { role: name });
        }

        let role = self.roles.entry(name.clone()).or_insert_with(|| Role {
            name: name.clone(),
            hosts: BTreeSet::new(),
            flags: BTreeSet::new(),
        });
        role.flags.extend(flags);

        for host in hosts {
            // First spelling of a host wins; later ones only add membership.
            let canonical = match self.host_roles.get_key_value(&host) {
                Some((existing, _)) => existing.clone(),
                None => host,
            };
            role.hosts.insert(canonical.clone());
            self.host_roles
                .entry(canonical)
                .or_default()
                .insert(name.clone());
        }

        Ok(())
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn resolve_role(&self, name: &str) -> Result<&BTreeSet<Host>, CapstanError> {
        self.roles
            .get(name)
            .map(|role| &role.hosts)
            .ok_or_else(|| CapstanError::UnknownRole(name.to_string()))
    }

    /// Hosts belonging to at least one role carrying `flag`
    pub fn hosts_with_flag(&self, flag: &str) -> BTreeSet<Host> {
        self.roles
            .values()
            .filter(|role| role.has_flag(flag))
            .flat_map(|role| role.hosts.iter().cloned())
            .collect()
    }

    pub fn roles_for(&self, host: &Host) -> BTreeSet<String> {
        self.host_roles.get(host).cloned().unwrap_or_default()
    }

    /// Every distinct host, each exactly once
    pub fn all_hosts(&self) -> Vec<Host> {
        self.host_roles.keys().cloned().collect()
    }

    /// Union of the named roles' hosts, de-duplicated. An empty list means
    /// every host.
    pub fn hosts_for_roles(&self, names: &[String]) -> Result<Vec<Host>, CapstanError> {
        if names.is_empty() {
            return Ok(self.all_hosts());
        }
        let mut hosts = BTreeSet::new();
        for name in names {
            hosts.extend(self.resolve_role(name)?.iter().cloned());
        }
        Ok(hosts.into_iter().collect())
    }
}
