//! Workshift accounts service
//!
//! Account registration, authentication and administration. The crate is
//! split into a credential manager ([`credentials`]), the account lifecycle
//! evaluator ([`lifecycle`]), storage ([`repositories`]), the flows built on
//! top of them ([`service`]) and the axum transport ([`routes`]).

pub mod config;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod state;
pub mod uploads;
pub mod validation;

pub use error::{AccountError, AccountResult};
pub use state::AppState;
