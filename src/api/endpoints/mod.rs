//! HTTP endpoint handlers.

pub mod claims;
pub mod health;
