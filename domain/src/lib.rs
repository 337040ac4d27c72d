//! Domain layer: notification recording and presentation, access token
//! handling, and the store abstraction they run against.
//!
//! `web` depends on this crate only; it never reaches into the store's own
//! error types or the JWT library directly.

pub use events::UserId;

pub mod error;
pub mod jwt;
pub mod notification;
pub mod store;
