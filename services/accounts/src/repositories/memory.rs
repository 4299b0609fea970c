//! In-memory account store
//!
//! Mirrors the PostgreSQL store's semantics, including the unique email
//! constraint, so the service can be exercised without a database.

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::AccountStore;
use crate::models::{Account, Contract};

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    contracts: RwLock<Vec<Contract>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a contract to an account
    pub async fn add_contract(&self, contract: Contract) {
        self.contracts.write().await.push(contract);
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> DatabaseResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.reset_password_token.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn list(&self) -> DatabaseResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self.accounts.read().await.values().cloned().collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }

    async fn load_contracts(&self, account_id: Uuid) -> DatabaseResult<Vec<Contract>> {
        let contracts = self.contracts.read().await;
        Ok(contracts
            .iter()
            .filter(|c| c.user_id == account_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, account: &Account) -> DatabaseResult<()> {
        let mut accounts = self.accounts.write().await;
        check_unique_email(&accounts, account)?;
        accounts.insert(account.id, stored_copy(account));
        Ok(())
    }

    async fn update(
        &self,
        account: &Account,
        expected_reset_hash: Option<&str>,
    ) -> DatabaseResult<bool> {
        let mut accounts = self.accounts.write().await;
        let Some(current) = accounts.get(&account.id) else {
            return Ok(false);
        };
        if let Some(expected) = expected_reset_hash {
            if current.reset_password_token.as_deref() != Some(expected) {
                return Ok(false);
            }
        }

        check_unique_email(&accounts, account)?;
        accounts.insert(account.id, stored_copy(account));
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let removed = self.accounts.write().await.remove(&id).is_some();
        if removed {
            self.contracts.write().await.retain(|c| c.user_id != id);
        }
        Ok(removed)
    }
}

fn check_unique_email(accounts: &HashMap<Uuid, Account>, account: &Account) -> DatabaseResult<()> {
    if accounts
        .values()
        .any(|a| a.email == account.email && a.id != account.id)
    {
        return Err(DatabaseError::UniqueViolation(
            "accounts_email_key".to_string(),
        ));
    }
    Ok(())
}

/// What a database row would hold: no plaintext, no joined contracts
fn stored_copy(account: &Account) -> Account {
    let mut stored = account.clone();
    stored.pending_password = None;
    stored.contrats.clear();
    stored
}
