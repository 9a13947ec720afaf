//! Save/delete orchestration of saved queries across a home node and a set
//! of network respondent nodes.
//!
//! The home node is the single source of truth: every operation talks to it
//! first and only then fans out, best effort and in parallel, to the enabled
//! network nodes. Network failures are recorded per node and never fail the
//! operation.
//!
//! # Modules
//!
//! - [`transport`]: the node collaborator trait and typed delete response
//! - [`http`]: reqwest implementation of the transport
//! - [`session`]: explicit client workflow state passed into and out of
//!   every operation
//! - [`save`] / [`delete`]: the two orchestrators
//! - [`fanout`]: parallel network propagation with per-node outcomes
//! - [`concepts`]: concept index collaborator and local builder
//! - [`locks`]: optional per-universal-id serialization
//! - [`open`]: loading a saved query into the session
//! - [`federation`]: facade tying the pieces together
//! - [`config`]: client configuration file

pub mod concepts;
pub mod config;
pub mod delete;
pub mod error;
pub mod fanout;
pub mod federation;
pub mod http;
pub mod locks;
pub mod open;
pub mod save;
pub mod session;
pub mod transport;

pub use concepts::{ConceptIndex, ConceptIndexer, ConceptNode, LocalConceptIndexer};
pub use config::{ConfigError, FederationConfig};
pub use delete::{Decision, DeleteOrchestrator, DeleteOutcome, DeletedReport, PendingCascade, QueryRef};
pub use error::{FederationError, RejectionKind, TransportError};
pub use fanout::{NodeOutcome, NodeStatus, PropagationReport};
pub use federation::{Federation, FederationContext};
pub use http::HttpTransport;
pub use locks::IdentifierLocks;
pub use open::{open_saved, OpenOutcome};
pub use save::{SaveOrchestrator, SaveOutcome, SavedReport};
pub use session::{AfterSave, CurrentQuery, Session, Transition, View};
pub use transport::{HomeDeleteResponse, QueryTransport};
