//! nestbox-core: package-nesting consistency engine.
//!
//! Physical containers (packages) nest inside one another: bags in boxes,
//! boxes on pallets. This crate keeps that forest consistent while inventory
//! moves: completed movements produce a batch of proposed parent/child
//! [`link::Link`]s, the batch is validated as a unit (no ambiguous moves, no
//! loops, depth within the configured bound), and only then are the
//! authoritative parent pointers rewritten, atomically.
//!
//! # Conventions
//!
//! - **Errors**: store plumbing returns `anyhow::Result`; everything
//!   batch-facing returns the typed [`error::LinkError`].
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **Configuration**: [`config::ValidationConfig`] is resolved by the
//!   caller and threaded explicitly through every validation call.

pub mod config;
pub mod db;
pub mod error;
pub mod fulfill;
pub mod graph;
pub mod link;
pub mod model;
