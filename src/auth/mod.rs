//! OAuth client-credentials authentication.

mod manager;
mod token;

pub use manager::TokenManager;
pub use token::AccessToken;
