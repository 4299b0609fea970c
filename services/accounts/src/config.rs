//! HTTP server configuration

use anyhow::Result;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Deployment environment, e.g. "development" or "production"
    pub environment: String,
    /// Frontend base URL used in reset links, with trailing slash
    pub front_url: String,
    /// Lifetime of the session cookie in days
    pub cookie_expire_days: i64,
    /// Directory receiving profile photos
    pub upload_path: String,
    /// Largest accepted photo in bytes
    pub max_file_upload: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            environment: "development".to_string(),
            front_url: "http://localhost:3000/".to_string(),
            cookie_expire_days: 30,
            upload_path: "./public/uploads".to_string(),
            max_file_upload: 1_000_000,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `PORT`: Port to listen on (default: 8000)
    /// - `NODE_ENV`: Deployment environment (default: "development")
    /// - `FRONT_URL`: Frontend base URL (default: "http://localhost:3000/")
    /// - `JWT_COOKIE_EXPIRE`: Session cookie lifetime in days (default: 30)
    /// - `FILE_UPLOAD_PATH`: Photo directory (default: "./public/uploads")
    /// - `MAX_FILE_UPLOAD`: Largest photo in bytes (default: 1000000)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = match std::env::var("PORT") {
            Ok(value) => value
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT {}: {}", value, e))?,
            Err(_) => defaults.port,
        };

        let mut front_url = std::env::var("FRONT_URL").unwrap_or(defaults.front_url);
        if !front_url.ends_with('/') {
            front_url.push('/');
        }

        Ok(ServerConfig {
            port,
            environment: std::env::var("NODE_ENV").unwrap_or(defaults.environment),
            front_url,
            cookie_expire_days: std::env::var("JWT_COOKIE_EXPIRE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cookie_expire_days),
            upload_path: std::env::var("FILE_UPLOAD_PATH").unwrap_or(defaults.upload_path),
            max_file_upload: std::env::var("MAX_FILE_UPLOAD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_file_upload),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
