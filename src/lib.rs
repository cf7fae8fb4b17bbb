//! Client core for a cash-flow tracker API.
//!
//! Each data domain (categories, merchants, receipts, rules, alerts and the
//! user profile) is mirrored into a [`provider`] that serves a cached snapshot
//! immediately and revalidates it against the API in the background.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod logging;
pub mod provider;
pub mod session;

#[cfg(test)]
mod testing;
