//! Project content for the portfolio site: pulls project records from the
//! static snapshot, Sanity or Strapi, normalizes whichever shape arrives into
//! one canonical [`types::Project`] per language and serves them over HTTP.

pub mod auth;
pub mod core;
pub mod error;
pub mod server;
pub mod types;

pub use error::{Error, Result};
