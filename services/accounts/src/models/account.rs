//! Account model, request payloads and the public projection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Contract, Role};

/// Photo recorded for accounts that never uploaded one
pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Account entity
///
/// Responses go through [`AccountResponse`], which leaves out the credential
/// fields.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Plaintext set during this unit of work, hashed on the next save
    pub pending_password: Option<String>,
    pub role: Role,
    pub reset_password_token: Option<String>,
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub entry_date: Option<DateTime<Utc>>,
    pub actif: bool,
    pub photo: String,
    /// Sorted by start date once loaded
    pub contrats: Vec<Contract>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a not-yet-persisted account; the password is hashed on first save.
    pub fn new(username: String, email: String, password: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash: String::new(),
            pending_password: Some(password),
            role,
            reset_password_token: None,
            reset_password_expire: None,
            entry_date: None,
            actif: false,
            photo: DEFAULT_PHOTO.to_string(),
            contrats: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_password(&mut self, plaintext: String) {
        self.pending_password = Some(plaintext);
    }

    /// Store the hashed reset token together with its expiry
    pub fn set_reset_token(&mut self, hashed: String, expires_at: DateTime<Utc>) {
        self.reset_password_token = Some(hashed);
        self.reset_password_expire = Some(expires_at);
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expire = None;
    }
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub entry_date: Option<DateTime<Utc>>,
    pub actif: bool,
    pub photo: String,
    pub contrats: Vec<Contract>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            entry_date: account.entry_date,
            actif: account.actif,
            photo: account.photo.clone(),
            contrats: account.contrats.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Registration and administrative creation payload
///
/// Fields default to empty so that missing values surface as validation
/// errors instead of body rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAccount {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
}

/// Login credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginCredentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Self-service profile update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDetails {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Password change for an authenticated account
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePassword {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForgotPassword {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetPassword {
    #[serde(default)]
    pub password: String,
}

/// Administrative account update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAccount {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}
