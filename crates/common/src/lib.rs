//! Common types shared by the avatar-refresh crates

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
