//! HTTP node for federated saved queries.
//!
//! Serves one node's saved-query store: authoritative saves when acting as a
//! home node, mirror saves when acting as a network node, plus load, list
//! and delete with a typed dependents conflict.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod schema;
pub mod service;
pub mod state;
