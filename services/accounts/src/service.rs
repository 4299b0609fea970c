//! Account operations
//!
//! Every flow the HTTP layer exposes lives here, independent of axum:
//! registration, login, password changes and resets, and administrative
//! account management.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    credentials::CredentialManager,
    error::{AccountError, AccountResult},
    mailer::{EmailMessage, Mailer},
    models::{
        Account, ForgotPassword, LoginCredentials, NewAccount, ResetPassword, Role, UpdateAccount,
        UpdateDetails, UpdatePassword,
    },
    repositories::AccountRepository,
    uploads::{PhotoStorage, PhotoUpload},
    validation::{validate_email, validate_password, validate_username},
};

/// Session token handed back after a successful authentication
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub token: String,
    pub role: Role,
}

/// Account service
#[derive(Clone)]
pub struct AccountService {
    repository: AccountRepository,
    credentials: Arc<CredentialManager>,
    mailer: Arc<dyn Mailer>,
    photos: PhotoStorage,
    front_url: String,
}

impl AccountService {
    pub fn new(
        repository: AccountRepository,
        credentials: Arc<CredentialManager>,
        mailer: Arc<dyn Mailer>,
        photos: PhotoStorage,
        front_url: String,
    ) -> Self {
        Self {
            repository,
            credentials,
            mailer,
            photos,
            front_url,
        }
    }

    fn grant(&self, account: &Account) -> AccountResult<SessionGrant> {
        let token = self.credentials.issue_session_token(account.id)?;
        Ok(SessionGrant {
            token,
            role: account.role,
        })
    }

    async fn require(&self, id: Uuid) -> AccountResult<Account> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("User not found with id of {}", id)))
    }

    fn build_account(payload: NewAccount) -> AccountResult<Account> {
        validate_username(&payload.username)?;
        validate_email(&payload.email)?;
        validate_password(&payload.password)?;

        Ok(Account::new(
            payload.username,
            payload.email,
            payload.password,
            payload.role.unwrap_or_default(),
        ))
    }

    /// Register a new account and open a session for it
    pub async fn register(&self, payload: NewAccount) -> AccountResult<SessionGrant> {
        let mut account = Self::build_account(payload)?;
        info!("Registering account {}", account.email);

        self.repository.create(&mut account).await?;
        self.grant(&account)
    }

    /// Authenticate with email and password
    ///
    /// Unknown email and wrong password are reported identically.
    pub async fn login(&self, credentials: LoginCredentials) -> AccountResult<SessionGrant> {
        let (Some(email), Some(password)) = (
            credentials.email.filter(|e| !e.is_empty()),
            credentials.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AccountError::Validation(
                "Please provide an email and password".to_string(),
            ));
        };

        let Some(account) = self.repository.find_by_email(&email).await? else {
            warn!("Login rejected for {}", email);
            return Err(AccountError::Authentication);
        };

        if !self
            .credentials
            .verify_password(&password, &account.password_hash)
        {
            warn!("Login rejected for {}", email);
            return Err(AccountError::Authentication);
        }

        info!("Account {} logged in", account.id);
        self.grant(&account)
    }

    /// Current account of an authenticated caller
    pub async fn me(&self, id: Uuid) -> AccountResult<Account> {
        self.require(id).await
    }

    pub async fn update_details(&self, id: Uuid, payload: UpdateDetails) -> AccountResult<Account> {
        let mut account = self.require(id).await?;

        if let Some(username) = payload.username {
            validate_username(&username)?;
            account.username = username;
        }
        if let Some(email) = payload.email {
            validate_email(&email)?;
            account.email = email;
        }

        self.repository.save(&mut account).await?;
        Ok(account)
    }

    /// Change the password after checking the current one
    ///
    /// Sessions issued before the change remain valid until they expire.
    pub async fn update_password(
        &self,
        id: Uuid,
        payload: UpdatePassword,
    ) -> AccountResult<SessionGrant> {
        let mut account = self.require(id).await?;

        if !self
            .credentials
            .verify_password(&payload.current_password, &account.password_hash)
        {
            warn!("Password change rejected for account {}", id);
            return Err(AccountError::IncorrectPassword);
        }

        validate_password(&payload.new_password)?;
        account.set_password(payload.new_password);
        self.repository.save(&mut account).await?;

        info!("Password changed for account {}", id);
        self.grant(&account)
    }

    /// Issue a reset token and email the reset link
    ///
    /// If the email cannot be delivered the token is withdrawn again.
    pub async fn forgot_password(&self, payload: ForgotPassword) -> AccountResult<()> {
        let mut account = self
            .repository
            .find_by_email(&payload.email)
            .await?
            .ok_or_else(|| AccountError::NotFound("There is no user with that email".to_string()))?;

        let reset = self.credentials.issue_reset_token(Utc::now());
        account.set_reset_token(reset.hashed, reset.expires_at);
        self.repository.save(&mut account).await?;

        let reset_url = format!("{}reset-password/{}", self.front_url, reset.raw);
        let message = EmailMessage {
            to: account.email.clone(),
            subject: "Workshift password reset".to_string(),
            body: format!(
                "You are receiving this email because you (or someone else) requested a \
                 password reset. Please follow this link to choose a new password:\n\n{}",
                reset_url
            ),
        };

        if let Err(e) = self.mailer.send_email(&message).await {
            error!("Reset email to {} failed: {}", account.email, e);
            account.clear_reset_token();
            if let Err(cleanup) = self.repository.save(&mut account).await {
                error!(
                    "Failed to withdraw reset token for account {}: {}",
                    account.id, cleanup
                );
            }
            return Err(AccountError::Delivery(e));
        }

        info!("Reset email sent to account {}", account.id);
        Ok(())
    }

    /// Set a new password using a reset token
    ///
    /// The token is consumed atomically: when several requests present the
    /// same token, only one of them changes the password.
    pub async fn reset_password(
        &self,
        raw_token: &str,
        payload: ResetPassword,
    ) -> AccountResult<SessionGrant> {
        let token_hash = CredentialManager::hash_reset_token(raw_token);
        let Some(mut account) = self.repository.find_by_reset_token(&token_hash).await? else {
            return Err(AccountError::Token);
        };

        if !self.credentials.consume_reset_token(
            raw_token,
            account.reset_password_token.as_deref(),
            account.reset_password_expire,
            Utc::now(),
        ) {
            warn!("Expired reset token presented for account {}", account.id);
            return Err(AccountError::Token);
        }

        validate_password(&payload.password)?;
        account.set_password(payload.password);
        account.clear_reset_token();
        self.repository
            .save_consuming_reset(&mut account, &token_hash)
            .await?;

        info!("Password reset for account {}", account.id);
        self.grant(&account)
    }

    pub async fn list_accounts(&self) -> AccountResult<Vec<Account>> {
        self.repository.list().await
    }

    pub async fn get_account(&self, id: Uuid) -> AccountResult<Account> {
        self.require(id).await
    }

    /// Create an account on someone's behalf and email them their credentials
    ///
    /// The account is kept even when the email cannot be delivered.
    pub async fn create_account(&self, payload: NewAccount) -> AccountResult<Account> {
        let password = payload.password.clone();
        let mut account = Self::build_account(payload)?;
        self.repository.create(&mut account).await?;
        info!("Created account {} ({})", account.id, account.role);

        let message = EmailMessage {
            to: account.email.clone(),
            subject: format!("Your Workshift {} account", account.role),
            body: format!(
                "A Workshift account has been created for you. You can now sign in with \
                 email: {} password: {}. Remember to change your password.",
                account.email, password
            ),
        };

        self.mailer
            .send_email(&message)
            .await
            .map_err(AccountError::Delivery)?;

        Ok(account)
    }

    pub async fn update_account(&self, id: Uuid, payload: UpdateAccount) -> AccountResult<Account> {
        let mut account = self.require(id).await?;

        if let Some(username) = payload.username {
            validate_username(&username)?;
            account.username = username;
        }
        if let Some(email) = payload.email {
            validate_email(&email)?;
            account.email = email;
        }
        if let Some(role) = payload.role {
            account.role = role;
        }
        if let Some(password) = payload.password {
            validate_password(&password)?;
            account.set_password(password);
        }

        self.repository.save(&mut account).await?;
        Ok(account)
    }

    pub async fn delete_account(&self, id: Uuid) -> AccountResult<()> {
        if !self.repository.delete(id).await? {
            return Err(AccountError::NotFound(format!(
                "User not found with id of {}",
                id
            )));
        }
        Ok(())
    }

    /// Store a profile photo and record it on the account
    pub async fn upload_photo(
        &self,
        id: Uuid,
        upload: Option<PhotoUpload>,
    ) -> AccountResult<String> {
        let mut account = self.require(id).await?;
        let upload =
            upload.ok_or_else(|| AccountError::Validation("Please upload a file".to_string()))?;

        let stored_name = self.photos.store(account.id, &upload).await?;
        account.photo = stored_name.clone();
        self.repository.save(&mut account).await?;

        Ok(stored_name)
    }
}
