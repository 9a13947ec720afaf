//! API schema types that only exist at the HTTP layer.
//!
//! Bodies shared with clients (save requests, save responses, delete
//! responses) live in `leaf_core::wire`.

pub mod queries;
