//! Auth-domain token models: redacted secrets and the access/refresh credential pair.

pub mod token;

pub use token::{credentials::*, secret::*};
