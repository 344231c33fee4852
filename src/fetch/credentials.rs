//! Credential sampling for the authenticated strategies

use crate::config::{CredentialEntry, StrategyKind};
use crate::HarvestError;
use rand::seq::SliceRandom;

/// A username/password pair used for one login exchange
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials sampled uniformly from the configured accounts
///
/// Entries with an empty username or password can never log in, so they are
/// dropped up front. An empty pool is reported once, at construction, instead
/// of every sample having to retry.
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    pool: Vec<Credential>,
}

impl CredentialProvider {
    /// Builds a provider from configured accounts
    ///
    /// # Returns
    ///
    /// * `Ok(CredentialProvider)` - At least one usable account
    /// * `Err(HarvestError::NoCredentials)` - No account has both a username and a password
    pub fn from_entries(
        entries: &[CredentialEntry],
        strategy: StrategyKind,
    ) -> Result<Self, HarvestError> {
        let pool: Vec<Credential> = entries
            .iter()
            .filter(|e| !e.username.is_empty() && !e.password.is_empty())
            .map(|e| Credential {
                username: e.username.clone(),
                password: e.password.clone(),
            })
            .collect();

        if pool.is_empty() {
            return Err(HarvestError::NoCredentials {
                strategy: strategy.as_str().to_string(),
            });
        }

        if pool.len() < entries.len() {
            tracing::warn!(
                "Ignoring {} credential entries with an empty username or password",
                entries.len() - pool.len()
            );
        }

        Ok(Self { pool })
    }

    /// Picks a credential uniformly at random
    pub fn sample(&self) -> &Credential {
        // The pool is non-empty by construction
        self.pool
            .choose(&mut rand::thread_rng())
            .unwrap_or(&self.pool[0])
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
