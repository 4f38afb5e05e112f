//! HTTP surface for the trash lifecycle.
//!
//! This crate provides:
//! - Trash listing, trashing, restore and permanent delete
//! - Override audit lookup
//! - Versioned book uploads with override
//! - The periodic sweep task

pub mod auth;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod state;
pub mod sweep;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
