//! Account lifecycle evaluator
//!
//! Runs immediately before every account persist and keeps the derived
//! fields consistent: the password hash, the entry date and the active flag.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::{
    credentials::{CredentialError, CredentialManager},
    models::{Account, Contract},
};

/// Derive `entry_date` and `actif` from the account's contracts.
///
/// Sorts `account.contrats` by start date (stable), sets the entry date from
/// the earliest contract when none is recorded yet, and marks the account
/// active if any contract covers `now`.
pub fn evaluate_contracts(account: &mut Account, now: DateTime<Utc>) {
    account.contrats.sort_by_key(|c| c.date_debut);

    if account.entry_date.is_none() {
        if let Some(first) = account.contrats.first() {
            account.entry_date = Some(first.date_debut);
        }
    }

    account.actif = account.contrats.iter().any(|c| c.is_active_at(now));
}

/// Pre-persist hook for accounts
#[derive(Clone)]
pub struct LifecycleEvaluator {
    credentials: Arc<CredentialManager>,
}

impl LifecycleEvaluator {
    pub fn new(credentials: Arc<CredentialManager>) -> Self {
        Self { credentials }
    }

    /// Prepare an account for persistence.
    ///
    /// Hashes a pending plaintext password, attaches the freshly loaded
    /// contracts and recomputes the derived fields.
    pub fn prepare(
        &self,
        account: &mut Account,
        contracts: Vec<Contract>,
        now: DateTime<Utc>,
    ) -> Result<(), CredentialError> {
        if let Some(plaintext) = account.pending_password.take() {
            account.password_hash = self.credentials.hash_password(&plaintext)?;
        }

        account.contrats = contracts;
        evaluate_contracts(account, now);

        debug!(
            "Evaluated account {}: actif={}, {} contract(s)",
            account.id,
            account.actif,
            account.contrats.len()
        );

        Ok(())
    }
}
