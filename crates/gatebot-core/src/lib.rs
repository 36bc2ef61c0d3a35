//! Core domain + application logic for the portal verification bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the
//! persistence backend live behind ports (traits) implemented in adapter
//! crates, so the verification state machine is testable in isolation.

pub mod callback;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod guard;
pub mod logging;
pub mod platform;
pub mod requirements;
pub mod service;
pub mod store;
pub mod verify;
pub mod wizard;

#[cfg(test)]
pub(crate) mod testutil;

pub use errors::{Error, Result};
