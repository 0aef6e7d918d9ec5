//! Core types for quill
//!
//! This crate contains domain types shared across all other crates.

mod config;
mod error;
mod journal;
mod session;
mod task;
mod template;
mod user;

pub use config::*;
pub use error::*;
pub use journal::*;
pub use session::*;
pub use task::*;
pub use template::*;
pub use user::*;

/// Generate a fresh entity id (uuid v4, printable).
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
