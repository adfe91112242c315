//! Core types and algorithms for the Vitrine activity view.
//!
//! This crate has no HTTP dependencies. It owns the domain
//! records mirrored from the remote testing platform, the [`api::TargetApi`]
//! abstraction the other crates talk through, and the pure transformations
//! that turn ID-linked upstream records into one denormalised view.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod api;
pub mod assemble;
pub mod audience;
pub mod error;
pub mod rename;
pub mod scan;
pub mod scheduling;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{Error, Result};
