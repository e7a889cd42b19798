//! Admin whitelist for mutating RPC methods.

use std::collections::BTreeSet;

use herd_types::Identity;

/// Environment variable holding a comma-separated list of admin identities.
pub const WHITELIST_ENV: &str = "HERD_ADMIN_WHITELIST";

/// Identities allowed to register livestock, edit splits, settle and manage
/// wallets. Empty denies everyone.
#[derive(Debug, Clone, Default)]
pub struct AdminWhitelist {
    identities: BTreeSet<String>,
}

impl AdminWhitelist {
    pub fn new<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            identities: identities
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list. Entries are trimmed; empties dropped.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Config entries plus `HERD_ADMIN_WHITELIST`, if set.
    pub fn from_config_and_env(configured: &[String]) -> Self {
        let mut whitelist = Self::new(configured);
        if let Ok(value) = std::env::var(WHITELIST_ENV) {
            whitelist.identities.extend(Self::parse(&value).identities);
        }
        whitelist
    }

    pub fn is_authorized(&self, identity: &str) -> bool {
        self.identities.contains(identity.trim())
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Masked identities for display.
    pub fn masked(&self) -> Vec<String> {
        self.identities
            .iter()
            .map(|id| Identity::new(id.clone()).masked())
            .collect()
    }
}
