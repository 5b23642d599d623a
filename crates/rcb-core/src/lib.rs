//! Core logic for the retention CRM bot.
//!
//! Turns uploaded retention spreadsheets into per-segment CSV extracts and sends them back.
//! Nothing in here knows about Telegram: the chat platform lives behind
//! [`messaging::port::MessagingPort`], implemented in the adapter crate.

pub mod classify;
pub mod config;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod logging;
pub mod messaging;
pub mod pipeline;
pub mod source;
pub mod utils;
pub mod writer;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
