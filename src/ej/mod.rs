//! EJ platform integration: REST client, participant identity and
//! external authentication links.

pub mod auth_link;
pub mod client;
#[cfg(test)]
pub(crate) mod mock;
pub mod models;
pub mod participant;
pub mod platform;
pub mod routes;

pub use client::HttpEjPlatform;
pub use platform::EjPlatform;
