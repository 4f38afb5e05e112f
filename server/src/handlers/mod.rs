//! HTTP request handlers.

pub mod common;
pub mod health;
pub mod trash;
pub mod uploads;

pub use health::*;
pub use trash::*;
pub use uploads::*;
