//! HTTP client for the remote testing platform.
//!
//! [`TargetClient`] implements [`vitrine_core::api::TargetApi`] with one
//! request per call, authenticated through a per-client [`TokenCache`].

pub mod client;
pub mod config;
pub mod token;

pub use client::TargetClient;
pub use config::TargetConfig;
pub use token::{AccessToken, TokenCache};
