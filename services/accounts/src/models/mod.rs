//! Account service models

pub mod account;
pub mod contract;
pub mod role;

// Re-export for convenience
pub use account::{
    Account, AccountResponse, DEFAULT_PHOTO, ForgotPassword, LoginCredentials, NewAccount,
    ResetPassword, UpdateAccount, UpdateDetails, UpdatePassword,
};
pub use contract::Contract;
pub use role::{Role, UnknownRole};
