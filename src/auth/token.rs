//! Access token entities and redacted secret wrappers.

pub mod access;
pub mod secret;
