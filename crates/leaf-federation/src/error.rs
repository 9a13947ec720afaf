//! Error types for federation.
//!
//! [`TransportError`] describes a failed call to a single node. It is fatal
//! only when the node is the home node; for network nodes it ends up as a
//! [`crate::NodeStatus::Failed`] entry.
//!
//! [`FederationError`] is the caller-facing rejection taxonomy. Its
//! `Display` output is the message shown to the user.

use leaf_core::{CoreError, QueryDependent};
use thiserror::Error;

/// A call to one respondent node failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be built.
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The HTTP request could not be completed.
    #[error("request to node '{node}' failed: {source}")]
    Http {
        node: String,
        #[source]
        source: reqwest::Error,
    },

    /// The node answered with an unexpected status.
    #[error("node '{node}' answered {status}: {body}")]
    Status {
        node: String,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected payload.
    #[error("could not decode response from node '{node}': {reason}")]
    Decode { node: String, reason: String },

    /// The node could not be reached at all.
    #[error("node '{node}' is unreachable")]
    Unreachable { node: String },

    /// The node refused a save that would create a recursive dependency.
    #[error("{message}")]
    RecursiveDependency { node: String, message: String },
}

/// Coarse classification of a [`FederationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Local validation failed; no network call was made.
    Validation,
    /// The home node failed or refused the operation.
    HomeOperation,
    /// A delete is blocked by dependents owned by someone else.
    ForeignDependents,
    /// A forced delete was answered with another dependents conflict.
    ForcedDeleteConflict,
}

/// Why a save or delete was rejected.
#[derive(Debug, Error)]
pub enum FederationError {
    /// The save would create a recursive dependency.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// The home node found a recursive dependency through queries this
    /// session does not hold.
    #[error("{message}")]
    RecursiveOnHome { message: String },

    /// The home node call failed. Nothing was changed locally.
    #[error("something went wrong when attempting to {operation} your query: {source}")]
    HomeOperation {
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    /// Other users' saved queries depend on the query being deleted.
    #[error("{}", foreign_dependents_message(.blocking))]
    ForeignDependents {
        query: String,
        blocking: Vec<QueryDependent>,
    },

    /// The home node still reported dependents for a forced delete.
    #[error(
        "\"{query}\" could not be deleted: {} dependent queries appeared while deleting",
        .dependents.len()
    )]
    ForcedDeleteConflict {
        query: String,
        dependents: Vec<QueryDependent>,
    },
}

impl FederationError {
    /// Rejection for a failed home save. A recursive dependency found by the
    /// home node is still a validation error.
    pub fn home_save(source: TransportError) -> Self {
        match source {
            TransportError::RecursiveDependency { message, .. } => {
                FederationError::RecursiveOnHome { message }
            }
            source => FederationError::HomeOperation {
                operation: "save",
                source,
            },
        }
    }

    pub fn kind(&self) -> RejectionKind {
        match self {
            FederationError::Validation(_) | FederationError::RecursiveOnHome { .. } => {
                RejectionKind::Validation
            }
            FederationError::HomeOperation { .. } => RejectionKind::HomeOperation,
            FederationError::ForeignDependents { .. } => RejectionKind::ForeignDependents,
            FederationError::ForcedDeleteConflict { .. } => RejectionKind::ForcedDeleteConflict,
        }
    }

    /// Short header for the blocking message shown to the user.
    pub fn header(&self) -> &'static str {
        match self {
            FederationError::Validation(_) | FederationError::RecursiveOnHome { .. } => {
                "Recursive query error"
            }
            FederationError::HomeOperation { operation: "save", .. } => "Error Saving Query",
            FederationError::HomeOperation { operation: "load", .. } => "Error Loading Query",
            FederationError::HomeOperation { .. } => "Error Deleting Query",
            FederationError::ForeignDependents { .. }
            | FederationError::ForcedDeleteConflict { .. } => "Error Deleting Query",
        }
    }
}

fn foreign_dependents_message(blocking: &[QueryDependent]) -> String {
    match blocking {
        [] => "this query has dependents and cannot be deleted".to_string(),
        [only] => format!(
            "Another query, \"{}\", owned by {}, depends on this query and therefore this cannot be deleted.",
            only.name, only.owner
        ),
        [first, ..] => format!(
            "There are {} other queries, including \"{}\", owned by {}, that depend on this query and therefore this cannot be deleted.",
            blocking.len(),
            first.name,
            first.owner
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dependent(name: &str, owner: &str) -> QueryDependent {
        QueryDependent {
            universal_id: format!("urn:leaf:query:{name}").into(),
            name: name.to_string(),
            owner: owner.to_string(),
        }
    }

    #[test]
    fn single_foreign_dependent_names_query_and_owner() {
        let err = FederationError::ForeignDependents {
            query: "A".into(),
            blocking: vec![dependent("C", "bob")],
        };
        let msg = err.to_string();
        assert!(msg.contains("\"C\""));
        assert!(msg.contains("bob"));
        assert_eq!(err.kind(), RejectionKind::ForeignDependents);
    }

    #[test]
    fn several_foreign_dependents_report_count() {
        let err = FederationError::ForeignDependents {
            query: "A".into(),
            blocking: vec![dependent("C", "bob"), dependent("D", "carol")],
        };
        assert!(err.to_string().starts_with("There are 2 other queries"));
    }

    #[test]
    fn home_errors_have_operation_specific_headers() {
        let err = FederationError::HomeOperation {
            operation: "save",
            source: TransportError::Unreachable { node: "home".into() },
        };
        assert_eq!(err.header(), "Error Saving Query");
        assert_eq!(err.kind(), RejectionKind::HomeOperation);
    }

    #[test]
    fn recursive_refusal_from_home_is_a_validation_error() {
        let err = FederationError::home_save(TransportError::RecursiveDependency {
            node: "home".into(),
            message: "\"A\" depends on \"C\"".into(),
        });
        assert_eq!(err.kind(), RejectionKind::Validation);
        assert_eq!(err.header(), "Recursive query error");
        assert!(err.to_string().contains("\"C\""));

        let other = FederationError::home_save(TransportError::Unreachable { node: "home".into() });
        assert_eq!(other.kind(), RejectionKind::HomeOperation);
    }
}
