//! Repository layer for database operations

pub mod catalog;
pub mod documents;
pub mod providers;
pub mod requests;
pub mod sessions;
pub mod users;
