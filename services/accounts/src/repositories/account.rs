//! Account repository
//!
//! [`AccountStore`] is the raw storage contract. [`AccountRepository`] wraps a
//! store and runs the lifecycle evaluator before every write, so no caller
//! can store an account without its derived fields being recomputed.

use async_trait::async_trait;
use chrono::Utc;
use common::error::DatabaseResult;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AccountError, AccountResult},
    lifecycle::LifecycleEvaluator,
    models::{Account, Contract},
};

/// Storage contract for accounts
///
/// Writes must reject a second account with an existing email with
/// [`DatabaseError::UniqueViolation`].
///
/// [`DatabaseError::UniqueViolation`]: common::error::DatabaseError::UniqueViolation
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Account>>;

    /// Look up the account holding a reset token digest
    async fn find_by_reset_token(&self, token_hash: &str) -> DatabaseResult<Option<Account>>;

    async fn list(&self) -> DatabaseResult<Vec<Account>>;

    /// Contracts of an account, in no particular order
    async fn load_contracts(&self, account_id: Uuid) -> DatabaseResult<Vec<Contract>>;

    /// Store a new account
    async fn insert(&self, account: &Account) -> DatabaseResult<()>;

    /// Overwrite an existing account.
    ///
    /// With `expected_reset_hash`, the write only happens while the stored
    /// reset token digest still equals it. Returns whether a row was written;
    /// `false` when the account is gone or the condition no longer holds.
    async fn update(
        &self,
        account: &Account,
        expected_reset_hash: Option<&str>,
    ) -> DatabaseResult<bool>;

    /// Returns whether an account was removed
    async fn delete(&self, id: Uuid) -> DatabaseResult<bool>;
}

/// Account repository
#[derive(Clone)]
pub struct AccountRepository {
    store: Arc<dyn AccountStore>,
    evaluator: LifecycleEvaluator,
}

impl AccountRepository {
    /// Create a new account repository
    pub fn new(store: Arc<dyn AccountStore>, evaluator: LifecycleEvaluator) -> Self {
        Self { store, evaluator }
    }

    /// Run the lifecycle evaluator, then store a new account
    pub async fn create(&self, account: &mut Account) -> AccountResult<()> {
        self.prepare(account).await?;
        self.store.insert(account).await?;
        info!("Created account {}", account.id);
        Ok(())
    }

    /// Run the lifecycle evaluator, then overwrite an existing account
    ///
    /// An account deleted since it was loaded is reported as not found
    /// instead of being written back.
    pub async fn save(&self, account: &mut Account) -> AccountResult<()> {
        self.prepare(account).await?;
        if !self.store.update(account, None).await? {
            return Err(AccountError::NotFound(format!(
                "User not found with id of {}",
                account.id
            )));
        }
        info!("Saved account {}", account.id);
        Ok(())
    }

    /// Save an account whose reset token is being consumed
    ///
    /// Succeeds only while the stored digest is still `expected_hash`, so of
    /// several concurrent requests carrying the same token only one wins.
    pub async fn save_consuming_reset(
        &self,
        account: &mut Account,
        expected_hash: &str,
    ) -> AccountResult<()> {
        self.prepare(account).await?;
        if !self.store.update(account, Some(expected_hash)).await? {
            return Err(AccountError::Token);
        }
        info!("Saved account {} with reset token consumed", account.id);
        Ok(())
    }

    async fn prepare(&self, account: &mut Account) -> AccountResult<()> {
        let contracts = self.store.load_contracts(account.id).await?;
        let now = Utc::now();

        self.evaluator.prepare(account, contracts, now)?;
        account.updated_at = now;
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str) -> AccountResult<Option<Account>> {
        let account = self.store.find_by_email(email).await?;
        self.with_contracts(account).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> AccountResult<Option<Account>> {
        let account = self.store.find_by_id(id).await?;
        self.with_contracts(account).await
    }

    pub async fn find_by_reset_token(&self, token_hash: &str) -> AccountResult<Option<Account>> {
        let account = self.store.find_by_reset_token(token_hash).await?;
        self.with_contracts(account).await
    }

    pub async fn list(&self) -> AccountResult<Vec<Account>> {
        let mut accounts = self.store.list().await?;
        for account in &mut accounts {
            self.attach_contracts(account).await?;
        }
        Ok(accounts)
    }

    pub async fn delete(&self, id: Uuid) -> AccountResult<bool> {
        info!("Deleting account {}", id);
        Ok(self.store.delete(id).await?)
    }

    async fn with_contracts(&self, account: Option<Account>) -> AccountResult<Option<Account>> {
        match account {
            Some(mut account) => {
                self.attach_contracts(&mut account).await?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    async fn attach_contracts(&self, account: &mut Account) -> AccountResult<()> {
        let mut contracts = self.store.load_contracts(account.id).await?;
        contracts.sort_by_key(|c| c.date_debut);
        account.contrats = contracts;
        Ok(())
    }
}
