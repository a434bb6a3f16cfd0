//! Sakai OAE (nakamura) group store.
//!
//! Implements [`GroupStore`](worldsync_core::GroupStore) on top of the Sling
//! user manager and world creation servlets of a nakamura server.

pub mod client;

pub use client::NakamuraStore;
