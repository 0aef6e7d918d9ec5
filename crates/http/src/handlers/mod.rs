//! HTTP handlers, grouped by resource.

pub mod agent;
pub mod auth;
pub mod entries;
pub mod sessions;
pub mod tasks;
pub mod users;
