pub mod credential_store;
pub mod session_store;
pub mod token_registry;

// Re-export the primary store items so code outside can do
// "use crate::store::{SessionStore, TokenRegistry};"
pub use credential_store::{CredentialError, CredentialStore};
pub use session_store::SessionStore;
pub use token_registry::TokenRegistry;
