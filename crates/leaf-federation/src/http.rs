//! [`QueryTransport`] over HTTP with reqwest.
//!
//! Talks to the node API served by `leaf-server`:
//!
//! - `POST   /queries` home save
//! - `PUT    /queries/{universal_id}` mirror save
//! - `GET    /queries`, `GET /queries/{universal_id}`
//! - `DELETE /queries/{universal_id}?force=bool`, answering 409 with the
//!   dependents in `error.details.dependents`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use leaf_core::{
    CorrelationId, DeleteQueryResponse, DependentsConflict, NetworkIdentity, NodeSaveRequest,
    QueryDefinition, QuerySaveRequest, QuerySaveResponse, UniversalId, USER_HEADER,
};

use crate::error::TransportError;
use crate::transport::{HomeDeleteResponse, QueryTransport};

/// Error envelope returned by a node for non-2xx answers.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Option<DependentsConflict>,
}

const RECURSIVE_DEPENDENCY: &str = "RECURSIVE_DEPENDENCY";

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    user: String,
}

impl HttpTransport {
    /// Builds a transport identifying every request as `user`. `timeout`
    /// bounds each request end to end.
    pub fn new(user: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(HttpTransport {
            client,
            user: user.into(),
        })
    }

    fn url(node: &NetworkIdentity, universal_id: Option<&UniversalId>) -> String {
        let base = node.address.trim_end_matches('/');
        match universal_id {
            Some(uid) => format!("{base}/queries/{uid}"),
            None => format!("{base}/queries"),
        }
    }

    async fn send(
        &self,
        node: &NetworkIdentity,
        request: RequestBuilder,
    ) -> Result<Response, TransportError> {
        request
            .header(USER_HEADER, &self.user)
            .send()
            .await
            .map_err(|source| {
                if source.is_connect() {
                    TransportError::Unreachable {
                        node: node.name.clone(),
                    }
                } else {
                    TransportError::Http {
                        node: node.name.clone(),
                        source,
                    }
                }
            })
    }

    async fn read_body(node: &NetworkIdentity, response: Response) -> Result<String, TransportError> {
        response.text().await.map_err(|source| TransportError::Http {
            node: node.name.clone(),
            source,
        })
    }

    /// Decodes a successful JSON answer, turning any other status into
    /// [`TransportError::Status`].
    async fn expect_json<T: DeserializeOwned>(
        node: &NetworkIdentity,
        response: Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        let body = Self::read_body(node, response).await?;
        if !status.is_success() {
            return Err(status_error(node, status, body));
        }
        decode(node, &body)
    }
}

/// Error for a non-2xx answer. A 422 carrying the recursive dependency code
/// keeps its message so the caller can report it as a validation failure.
fn status_error(node: &NetworkIdentity, status: StatusCode, body: String) -> TransportError {
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
            if envelope.error.code == RECURSIVE_DEPENDENCY {
                return TransportError::RecursiveDependency {
                    node: node.name.clone(),
                    message: envelope.error.message,
                };
            }
        }
    }
    TransportError::Status {
        node: node.name.clone(),
        status: status.as_u16(),
        body,
    }
}

fn decode<T: DeserializeOwned>(node: &NetworkIdentity, body: &str) -> Result<T, TransportError> {
    serde_json::from_str(body).map_err(|err| TransportError::Decode {
        node: node.name.clone(),
        reason: err.to_string(),
    })
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn save_on_home(
        &self,
        home: &NetworkIdentity,
        request: &QuerySaveRequest,
    ) -> Result<QuerySaveResponse, TransportError> {
        let builder = self.client.post(Self::url(home, None)).json(request);
        let response = self.send(home, builder).await?;
        Self::expect_json(home, response).await
    }

    async fn save_on_node(
        &self,
        node: &NetworkIdentity,
        request: &QuerySaveRequest,
        correlation_id: &CorrelationId,
        universal_id: &UniversalId,
    ) -> Result<(), TransportError> {
        let body = NodeSaveRequest {
            correlation_id: correlation_id.clone(),
            query: request.clone(),
        };
        let builder = self
            .client
            .put(Self::url(node, Some(universal_id)))
            .json(&body);
        let response = self.send(node, builder).await?;
        let saved: QuerySaveResponse = Self::expect_json(node, response).await?;
        debug!(node = %node.name, universal_id = %saved.universal_id, ver = saved.ver, "mirror saved");
        Ok(())
    }

    async fn load_by_universal_id(
        &self,
        home: &NetworkIdentity,
        universal_id: &UniversalId,
    ) -> Result<QueryDefinition, TransportError> {
        let builder = self.client.get(Self::url(home, Some(universal_id)));
        let response = self.send(home, builder).await?;
        Self::expect_json(home, response).await
    }

    async fn list_on_home(
        &self,
        home: &NetworkIdentity,
    ) -> Result<Vec<QueryDefinition>, TransportError> {
        let builder = self.client.get(Self::url(home, None));
        let response = self.send(home, builder).await?;
        Self::expect_json(home, response).await
    }

    async fn delete_on_home(
        &self,
        home: &NetworkIdentity,
        universal_id: &UniversalId,
        force: bool,
    ) -> Result<HomeDeleteResponse, TransportError> {
        let builder = self
            .client
            .delete(Self::url(home, Some(universal_id)))
            .query(&[("force", force)]);
        let response = self.send(home, builder).await?;

        if response.status() == StatusCode::CONFLICT {
            let body = Self::read_body(home, response).await?;
            let envelope: ErrorEnvelope = decode(home, &body)?;
            let conflict = envelope.error.details.ok_or_else(|| TransportError::Decode {
                node: home.name.clone(),
                reason: "conflict response carries no dependents".to_string(),
            })?;
            return Ok(HomeDeleteResponse::Conflict {
                dependents: conflict.dependents,
            });
        }

        let deleted: DeleteQueryResponse = Self::expect_json(home, response).await?;
        Ok(HomeDeleteResponse::Deleted {
            deleted: deleted.deleted,
        })
    }

    /// A node that never received the query answers 404, which counts as
    /// already deleted.
    async fn delete_on_node(
        &self,
        node: &NetworkIdentity,
        universal_id: &UniversalId,
        force: bool,
    ) -> Result<(), TransportError> {
        let builder = self
            .client
            .delete(Self::url(node, Some(universal_id)))
            .query(&[("force", force)]);
        let response = self.send(node, builder).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(node = %node.name, universal_id = %universal_id, "already absent on node");
            return Ok(());
        }
        let _: DeleteQueryResponse = Self::expect_json(node, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaf_core::NodeId;

    fn node(address: &str) -> NetworkIdentity {
        NetworkIdentity {
            id: NodeId(1),
            name: "home".into(),
            address: address.into(),
            enabled: true,
            is_home_node: true,
        }
    }

    #[test]
    fn urls_join_without_double_slash() {
        let uid: UniversalId = "urn:leaf:query:1".into();
        assert_eq!(
            HttpTransport::url(&node("http://h:5001/"), Some(&uid)),
            "http://h:5001/queries/urn:leaf:query:1"
        );
        assert_eq!(
            HttpTransport::url(&node("http://h:5001"), None),
            "http://h:5001/queries"
        );
    }

    #[test]
    fn conflict_envelope_decodes_dependents() {
        let body = r#"{"success":false,"error":{"code":"CONFLICT","message":"m",
            "details":{"dependents":[{"universal_id":"u2","name":"B","owner":"bob"}]}}}"#;
        let envelope: ErrorEnvelope = decode(&node("http://h"), body).unwrap();
        let dependents = envelope.error.details.unwrap().dependents;
        assert_eq!(dependents[0].owner, "bob");
    }

    #[test]
    fn recursive_refusal_keeps_the_node_message() {
        let body = r#"{"success":false,"error":{"code":"RECURSIVE_DEPENDENCY",
            "message":"\"A\" cannot embed \"C\""}}"#;
        match status_error(&node("http://h"), StatusCode::UNPROCESSABLE_ENTITY, body.into()) {
            TransportError::RecursiveDependency { message, .. } => {
                assert!(message.contains("\"C\""));
            }
            other => panic!("expected recursive dependency, got {other:?}"),
        }
    }

    #[test]
    fn other_failures_keep_status_and_body() {
        let err = status_error(&node("http://h"), StatusCode::FORBIDDEN, "no".into());
        assert!(matches!(err, TransportError::Status { status: 403, .. }));
    }
}
