//! Token secrets and the credential pair persisted between sessions.

pub mod credentials;
pub mod secret;
