//! HTTP handler modules for the node API.
//!
//! Each sub-module implements thin handlers that parse requests, acquire the
//! service lock, delegate to [`crate::service::NodeService`], and return JSON
//! responses. No business logic lives in handlers.

pub mod queries;
