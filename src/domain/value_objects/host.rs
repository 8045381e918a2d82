//! Host value object
//!
//! A host is written as `[user@]address[:port]`. Identity is the address
//! alone: the same machine listed under two roles (or with two spellings
//! of the login) is one host and is deployed to once.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A deploy target machine
#[derive(Debug, Clone)]
pub struct Host {
    address: String,
    user: Option<String>,
    port: Option<u16>,
}

/// Why a host string was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostParseError(pub String);

impl std::fmt::Display for HostParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Host {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            user: None,
            port: None,
        }
    }

    /// Parse `[user@]address[:port]`
    pub fn parse(spec: &str) -> Result<Self, HostParseError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(HostParseError("host is empty".to_string()));
        }
        if spec.chars().any(char::is_whitespace) {
            return Err(HostParseError("host contains whitespace".to_string()));
        }

        let (user, rest) = match spec.split_once('@') {
            Some((user, rest)) => {
                if user.is_empty() {
                    return Err(HostParseError("empty user before '@'".to_string()));
                }
                (Some(user.to_string()), rest)
            }
            None => (None, spec),
        };

        let (address, port) = match rest.rsplit_once(':') {
            Some((address, port)) => {
                let port: u16 = port
                    .parse()
                    .map_err(|_| HostParseError(format!("invalid port '{}'", port)))?;
                (address, Some(port))
            }
            None => (rest, None),
        };

        if address.is_empty() {
            return Err(HostParseError("empty address".to_string()));
        }
        if address.contains('@') {
            return Err(HostParseError("more than one '@'".to_string()));
        }

        Ok(Self {
            address: address.to_string(),
            user,
            port,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Fill in the login when the host string did not carry one
    pub fn or_user(mut self, user: Option<&str>) -> Self {
        if self.user.is_none() {
            self.user = user.map(str::to_string);
        }
        self
    }

    /// `user@address` (or bare address) as passed to ssh
    pub fn ssh_destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.address),
            None => self.address.clone(),
        }
    }
}

impl PartialEq for Host {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Host {}

impl Hash for Host {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl PartialOrd for Host {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Host {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address.cmp(&other.address)
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_parse_bare_address() {
        let host = Host::parse("example.com").unwrap();
        assert_eq!(host.address(), "example.com");
        assert_eq!(host.user(), None);
        assert_eq!(host.port(), None);
    }

    #[test]
    fn host_parse_user_and_port() {
        let host = Host::parse("pete@example.com:2222").unwrap();
        assert_eq!(host.address(), "example.com");
        assert_eq!(host.user(), Some("pete"));
        assert_eq!(host.port(), Some(2222));
        assert_eq!(host.ssh_destination(), "pete@example.com");
    }

    #[test]
    fn host_parse_rejects_malformed() {
        assert!(Host::parse("").is_err());
        assert!(Host::parse("@example.com").is_err());
        assert!(Host::parse("example.com:http").is_err());
        assert!(Host::parse("a b").is_err());
        assert!(Host::parse("pete@").is_err());
    }

    #[test]
    fn host_identity_is_address() {
        let a = Host::parse("pete@example.com").unwrap();
        let b = Host::parse("deploy@example.com:22").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn host_or_user_keeps_explicit_login() {
        let host = Host::parse("root@example.com").unwrap().or_user(Some("pete"));
        assert_eq!(host.user(), Some("root"));
        let host = Host::new("example.com").or_user(Some("pete"));
        assert_eq!(host.user(), Some("pete"));
    }
}
