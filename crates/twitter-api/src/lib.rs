//! Authenticated Twitter REST API client
//!
//! `ApiClient` signs each request with the application credentials and the
//! user's access token from `twitter-auth`. `profile` holds the
//! profile-image refresh built on top of it.

pub mod client;
pub mod error;
pub mod profile;

pub use client::{ApiClient, DEFAULT_API_BASE};
pub use error::{Error, Result};
pub use profile::refresh_profile_image;
