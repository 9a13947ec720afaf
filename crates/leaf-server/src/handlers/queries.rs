//! Saved-query handlers (save, mirror, list, get, delete).
//!
//! The caller's identity arrives in the `x-leaf-user` header. It becomes the
//! owner of new queries and is checked against the owner on delete.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use leaf_core::{
    DeleteQueryResponse, NodeSaveRequest, QueryDefinition, QuerySaveRequest, QuerySaveResponse,
    UniversalId, USER_HEADER,
};

use crate::error::ApiError;
use crate::schema::queries::DeleteParams;
use crate::state::AppState;

fn optional_caller(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    match headers.get(USER_HEADER) {
        None => Ok(None),
        Some(value) => {
            let user = value
                .to_str()
                .map_err(|_| ApiError::BadRequest(format!("{USER_HEADER} is not valid text")))?
                .trim();
            Ok((!user.is_empty()).then(|| user.to_string()))
        }
    }
}

fn caller(headers: &HeaderMap) -> Result<String, ApiError> {
    optional_caller(headers)?
        .ok_or_else(|| ApiError::BadRequest(format!("missing {USER_HEADER} header")))
}

/// Saves a query on the home node, minting its universal id on first save.
///
/// `POST /queries`
pub async fn save_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<QuerySaveRequest>,
) -> Result<Json<QuerySaveResponse>, ApiError> {
    let user = caller(&headers)?;
    let mut service = state.service.lock().await;
    Ok(Json(service.save(&req, &user)?))
}

/// Mirrors a query saved on the home node.
///
/// `PUT /queries/{universal_id}`
pub async fn mirror_query(
    State(state): State<AppState>,
    Path(universal_id): Path<UniversalId>,
    headers: HeaderMap,
    Json(req): Json<NodeSaveRequest>,
) -> Result<Json<QuerySaveResponse>, ApiError> {
    let user = caller(&headers)?;
    let mut service = state.service.lock().await;
    Ok(Json(service.mirror(&universal_id, req, &user)?))
}

/// Lists saved queries, restricted to the caller's own when the header is set.
///
/// `GET /queries`
pub async fn list_queries(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<QueryDefinition>>, ApiError> {
    let user = optional_caller(&headers)?;
    let service = state.service.lock().await;
    Ok(Json(service.list(user.as_deref())?))
}

/// `GET /queries/{universal_id}`
pub async fn get_query(
    State(state): State<AppState>,
    Path(universal_id): Path<UniversalId>,
) -> Result<Json<QueryDefinition>, ApiError> {
    let service = state.service.lock().await;
    Ok(Json(service.get(&universal_id)?))
}

/// Deletes a query; answers 409 with the dependents unless `force` is set.
///
/// `DELETE /queries/{universal_id}?force=bool`
pub async fn delete_query(
    State(state): State<AppState>,
    Path(universal_id): Path<UniversalId>,
    Query(params): Query<DeleteParams>,
    headers: HeaderMap,
) -> Result<Json<DeleteQueryResponse>, ApiError> {
    let user = caller(&headers)?;
    let mut service = state.service.lock().await;
    let deleted = service.delete(&universal_id, params.force, &user)?;
    Ok(Json(DeleteQueryResponse { deleted }))
}
