//! PostgreSQL account store

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::AccountStore;
use crate::models::{Account, Contract, Role};

const ACCOUNT_COLUMNS: &str = r#"
    id, username, email, password_hash, role, reset_password_token,
    reset_password_expire, entry_date, actif, photo, created_at, updated_at
"#;

/// Apply the accounts schema migrations
pub async fn run_migrations(pool: &PgPool) -> DatabaseResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))
}

/// Account store backed by PostgreSQL
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a new PostgreSQL account store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> DatabaseResult<Option<Account>> {
        let query = format!("SELECT {} FROM accounts WHERE {}", ACCOUNT_COLUMNS, clause);
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(account_from_row).transpose()
    }
}

fn account_from_row(row: &PgRow) -> DatabaseResult<Account> {
    let role: String = row.try_get("role").map_err(DatabaseError::Query)?;
    let role = role.parse::<Role>().map_err(|e| {
        DatabaseError::Query(sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: Box::new(e),
        })
    })?;

    Ok(Account {
        id: row.try_get("id").map_err(DatabaseError::Query)?,
        username: row.try_get("username").map_err(DatabaseError::Query)?,
        email: row.try_get("email").map_err(DatabaseError::Query)?,
        password_hash: row.try_get("password_hash").map_err(DatabaseError::Query)?,
        pending_password: None,
        role,
        reset_password_token: row.try_get("reset_password_token").map_err(DatabaseError::Query)?,
        reset_password_expire: row.try_get("reset_password_expire").map_err(DatabaseError::Query)?,
        entry_date: row.try_get("entry_date").map_err(DatabaseError::Query)?,
        actif: row.try_get("actif").map_err(DatabaseError::Query)?,
        photo: row.try_get("photo").map_err(DatabaseError::Query)?,
        contrats: Vec::new(),
        created_at: row.try_get("created_at").map_err(DatabaseError::Query)?,
        updated_at: row.try_get("updated_at").map_err(DatabaseError::Query)?,
    })
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Account>> {
        self.fetch_one_where("email = $1", email).await
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Account>> {
        let query = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> DatabaseResult<Option<Account>> {
        self.fetch_one_where("reset_password_token = $1", token_hash).await
    }

    async fn list(&self) -> DatabaseResult<Vec<Account>> {
        let query = format!(
            "SELECT {} FROM accounts ORDER BY created_at DESC",
            ACCOUNT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        rows.iter().map(account_from_row).collect()
    }

    async fn load_contracts(&self, account_id: Uuid) -> DatabaseResult<Vec<Contract>> {
        sqlx::query_as::<_, Contract>(
            r#"
            SELECT id, user_id, date_debut, date_fin
            FROM contrats
            WHERE user_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn insert(&self, account: &Account) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, username, email, password_hash, role, reset_password_token,
                reset_password_expire, entry_date, actif, photo, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(&account.reset_password_token)
        .bind(account.reset_password_expire)
        .bind(account.entry_date)
        .bind(account.actif)
        .bind(&account.photo)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(())
    }

    async fn update(
        &self,
        account: &Account,
        expected_reset_hash: Option<&str>,
    ) -> DatabaseResult<bool> {
        // The reset digest comparison and the write happen in one statement
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                username = $2,
                email = $3,
                password_hash = $4,
                role = $5,
                reset_password_token = $6,
                reset_password_expire = $7,
                entry_date = $8,
                actif = $9,
                photo = $10,
                updated_at = $11
            WHERE id = $1
              AND ($12::text IS NULL OR reset_password_token = $12)
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(&account.reset_password_token)
        .bind(account.reset_password_expire)
        .bind(account.entry_date)
        .bind(account.actif)
        .bind(&account.photo)
        .bind(account.updated_at)
        .bind(expected_reset_hash)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }
}
