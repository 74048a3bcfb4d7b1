//! Options store for an AMP publishing plugin.
//!
//! The plugin keeps its whole configuration in one persisted blob. This crate
//! owns that blob's schema: it fills in defaults, migrates blobs written by
//! older plugin versions, validates updates, and derives the effective
//! configuration from the persisted value plus what the active theme and the
//! post type registry declare.

pub mod app;
pub mod database;
pub mod rpc_handler;
pub mod services;
pub mod types;
