//! Node identity and auth key secret naming

use serde::Serialize;
use std::fmt;

use crate::config::{ConfigSource, HOSTNAME_KEY, OP_NAME_KEY, SECRET_NAME_KEY};
use crate::error::ConfigError;

/// Prefix of derived auth key secret names
pub const SECRET_NAME_PREFIX: &str = "TAILSCALE_AUTHKEY_";

/// Hostname the node registers under on the tailnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeIdentity(String);

impl NodeIdentity {
    /// Surrounding whitespace is dropped; blank hostnames are rejected.
    pub fn new(hostname: impl Into<String>) -> Result<Self, ConfigError> {
        let hostname = hostname.into();
        let hostname = hostname.trim();
        if hostname.is_empty() {
            return Err(ConfigError::MissingHostname);
        }
        Ok(Self(hostname.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of the secret holding the tailnet auth key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretReference(String);

impl SecretReference {
    /// Derive the secret name for a hostname.
    ///
    /// `edge-node-7` becomes `TAILSCALE_AUTHKEY_EDGE_NODE_7`. Only case and
    /// hyphens change; surrounding whitespace is dropped.
    pub fn derive(identity: &NodeIdentity) -> Self {
        let key = identity.as_str().trim().to_uppercase().replace('-', "_");
        Self(format!("{SECRET_NAME_PREFIX}{key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the hostname: `TS_HOSTNAME` first, then `OPS_OP_NAME`.
pub fn resolve_hostname(config: &dyn ConfigSource) -> Result<NodeIdentity, ConfigError> {
    let hostname = config
        .get(HOSTNAME_KEY)
        .or_else(|| config.get(OP_NAME_KEY))
        .ok_or(ConfigError::MissingHostname)?;
    NodeIdentity::new(hostname)
}

/// Resolve the auth key secret name for `identity`.
///
/// `AUTHKEY_SECRET_NAME` is returned verbatim when set; otherwise the name is
/// derived from the hostname.
pub fn resolve_secret_name(
    config: &dyn ConfigSource,
    identity: &NodeIdentity,
) -> Result<SecretReference, ConfigError> {
    if let Some(name) = config.get(SECRET_NAME_KEY) {
        return Ok(SecretReference(name));
    }
    let derived = SecretReference::derive(identity);
    if derived.0.len() == SECRET_NAME_PREFIX.len() {
        return Err(ConfigError::MissingHostname);
    }
    Ok(derived)
}
