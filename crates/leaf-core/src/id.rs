//! Identifier newtypes for saved queries and respondent nodes.
//!
//! Node-local identity ([`QueryId`]) and cross-node identity
//! ([`UniversalId`]) are distinct types so that a local row id can never be
//! handed to a transport that expects a universal id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of every universal id minted by a home node.
pub const QUERY_URN_PREFIX: &str = "urn:leaf:query:";

/// Node-local identity of a persisted query. Never crosses the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryId(pub i64);

/// Stable cross-node identifier of a saved query, assigned by the home node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniversalId(String);

impl UniversalId {
    pub fn new(value: impl Into<String>) -> Self {
        UniversalId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Respondent node identifier within a [`crate::NodeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Per-node cohort query id correlating a mirrored save with the cohort
/// count that node last ran for the current query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub String);

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UniversalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UniversalId {
    fn from(value: &str) -> Self {
        UniversalId(value.to_string())
    }
}

impl From<String> for UniversalId {
    fn from(value: String) -> Self {
        UniversalId(value)
    }
}

impl AsRef<str> for UniversalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universal_id_display_is_raw_value() {
        let uid = UniversalId::new("urn:leaf:query:abc");
        assert_eq!(uid.to_string(), "urn:leaf:query:abc");
        assert_eq!(uid.as_str(), "urn:leaf:query:abc");
    }

    #[test]
    fn universal_id_serializes_as_plain_string() {
        let uid = UniversalId::from("urn:leaf:query:1");
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"urn:leaf:query:1\"");
    }

    #[test]
    fn node_id_display() {
        assert_eq!(format!("{}", NodeId(3)), "3");
        assert_eq!(format!("{}", QueryId(12)), "12");
    }

    #[test]
    fn universal_ids_order_lexically() {
        let a = UniversalId::from("a");
        let b = UniversalId::from("b");
        assert!(a < b);
    }
}
