//! Remote data service: contracts and the HTTP + JSON binding.

pub mod api_types;
mod client;
mod remote;

pub use api_types::ListParams;
pub use client::{ApiClient, HttpCollection};
pub use remote::{RemoteCollection, RemoteProfile};
