//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    config::ServerConfig,
    credentials::CredentialManager,
    lifecycle::LifecycleEvaluator,
    mailer::Mailer,
    repositories::{AccountRepository, AccountStore},
    service::AccountService,
    uploads::PhotoStorage,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: AccountService,
    pub credentials: Arc<CredentialManager>,
    pub repository: AccountRepository,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the repository, service and credential manager around a store
    pub fn new(
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        credentials: CredentialManager,
        config: ServerConfig,
    ) -> Self {
        let credentials = Arc::new(credentials);
        let repository =
            AccountRepository::new(store, LifecycleEvaluator::new(credentials.clone()));
        let photos = PhotoStorage::new(config.upload_path.clone(), config.max_file_upload);
        let service = AccountService::new(
            repository.clone(),
            credentials.clone(),
            mailer,
            photos,
            config.front_url.clone(),
        );

        Self {
            service,
            credentials,
            repository,
            config: Arc::new(config),
        }
    }
}
