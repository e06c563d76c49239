//! # Configuration Module
//!
//! Settings that every participant of one partyline must agree on: where
//! invitations are addressed, which context slot carries the operator, the
//! base URL stamped onto synthetic invitation requests, and how strictly the
//! dispatcher treats applications that do not accept their invitation.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `PARTYLINE_INVITE_PATH` | `/__invite__/` | Reserved invitation path |
//! | `PARTYLINE_KEY` | `partyline` | Context slot carrying the operator |
//! | `PARTYLINE_BASE_URL` | unset | Base URL for invitation requests |
//! | `PARTYLINE_INVITATION_POLICY` | `lenient` | `strict` or `lenient` |
//!
//! Malformed values fall back to the default, matching how the runtime
//! settings of the router are read.
//!
//! ## YAML
//!
//! ```yaml
//! invite_path: /__invite__/
//! partyline_key: partyline
//! base_url: http://localhost:8080/
//! invitation_policy: strict
//! ```

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PartylineError, Result};

/// Default reserved invitation path.
pub const DEFAULT_INVITE_PATH: &str = "/__invite__/";

/// Default context key under which the operator is delivered.
pub const DEFAULT_PARTYLINE_KEY: &str = "partyline";

/// How the dispatcher reacts when an application does not accept its invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationPolicy {
    /// Log a warning and carry on. Applications that are not partyline-aware
    /// answer the invite path with a 404; that is expected.
    #[default]
    Lenient,
    /// Fail dispatcher construction on the first error or non-success status.
    Strict,
}

impl InvitationPolicy {
    /// Parse a policy name, returning `None` for anything unrecognised.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Some(Self::Lenient),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Partyline configuration shared by the dispatcher and its connectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyConfig {
    /// Path every invitation is addressed to
    pub invite_path: String,
    /// Context slot through which the operator is handed to applications
    pub partyline_key: String,
    /// Base URL for synthetic invitation requests
    pub base_url: Option<Url>,
    /// Strict or lenient handling of refused invitations
    pub invitation_policy: InvitationPolicy,
}

impl Default for PartyConfig {
    fn default() -> Self {
        Self {
            invite_path: DEFAULT_INVITE_PATH.to_string(),
            partyline_key: DEFAULT_PARTYLINE_KEY.to_string(),
            base_url: None,
            invitation_policy: InvitationPolicy::Lenient,
        }
    }
}

impl PartyConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let invite_path = env::var("PARTYLINE_INVITE_PATH")
            .ok()
            .filter(|p| p.starts_with('/'))
            .unwrap_or(defaults.invite_path);
        let partyline_key = env::var("PARTYLINE_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .unwrap_or(defaults.partyline_key);
        let base_url = env::var("PARTYLINE_BASE_URL")
            .ok()
            .and_then(|u| Url::parse(&u).ok());
        let invitation_policy = env::var("PARTYLINE_INVITATION_POLICY")
            .ok()
            .and_then(|p| InvitationPolicy::parse(&p))
            .unwrap_or_default();
        Self {
            invite_path,
            partyline_key,
            base_url,
            invitation_policy,
        }
    }

    /// Parse a YAML document; absent fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Reject settings no participant could honour.
    pub fn validate(&self) -> Result<()> {
        if !self.invite_path.starts_with('/') {
            return Err(PartylineError::InvalidConfig(format!(
                "invite_path '{}' must start with '/'",
                self.invite_path
            )));
        }
        if self.partyline_key.is_empty() {
            return Err(PartylineError::InvalidConfig(
                "partyline_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_invite_path(mut self, path: impl Into<String>) -> Self {
        self.invite_path = path.into();
        self
    }

    #[must_use]
    pub fn with_partyline_key(mut self, key: impl Into<String>) -> Self {
        self.partyline_key = key.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub fn with_invitation_policy(mut self, policy: InvitationPolicy) -> Self {
        self.invitation_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PartyConfig::default();
        assert_eq!(config.invite_path, "/__invite__/");
        assert_eq!(config.partyline_key, "partyline");
        assert_eq!(config.base_url, None);
        assert_eq!(config.invitation_policy, InvitationPolicy::Lenient);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(InvitationPolicy::parse("strict"), Some(InvitationPolicy::Strict));
        assert_eq!(InvitationPolicy::parse(" LENIENT "), Some(InvitationPolicy::Lenient));
        assert_eq!(InvitationPolicy::parse("sometimes"), None);
    }

    #[test]
    fn test_yaml_partial_document_uses_defaults() {
        let config = PartyConfig::from_yaml_str("invitation_policy: strict\n").unwrap();
        assert_eq!(config.invitation_policy, InvitationPolicy::Strict);
        assert_eq!(config.invite_path, DEFAULT_INVITE_PATH);
    }

    #[test]
    fn test_yaml_rejects_relative_invite_path() {
        let err = PartyConfig::from_yaml_str("invite_path: __invite__\n").unwrap_err();
        assert!(matches!(err, PartylineError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_empty_key() {
        let config = PartyConfig::default().with_partyline_key("");
        assert!(config.validate().is_err());
    }
}
