//! HTTP request handlers.

use super::AppState;
use crate::db::{DbError, SavedPlan};
use crate::planner::{catalog, CameraDefinition, GatewayConfiguration, PlanError, Placement};
use crate::session::{SessionError, SessionView, SharedSession};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// Errors
// ============================================================================

fn plan_error_response(e: &PlanError) -> Response {
    match e {
        PlanError::InvalidInput(_) | PlanError::ConfigurationUnderflow { .. } => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        PlanError::UnknownStream(_) | PlanError::UnknownGateway(_) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        PlanError::Incomplete { unassigned } => (
            StatusCode::CONFLICT,
            Json(json!({ "error": e.to_string(), "unassigned": unassigned })),
        )
            .into_response(),
    }
}

fn session_error_response(e: &SessionError) -> Response {
    match e {
        SessionError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        SessionError::Full(_) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
        SessionError::Plan(plan) => plan_error_response(plan),
    }
}

fn db_error_response(e: &DbError) -> Response {
    match e {
        DbError::NotFound => (StatusCode::NOT_FOUND, "Plan not found").into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn lookup_session(state: &AppState, id: &str) -> Result<SharedSession, Response> {
    state
        .sessions
        .get(id)
        .await
        .map_err(|e| session_error_response(&e))
}

// ============================================================================
// API: Catalog
// ============================================================================

pub async fn handle_get_catalog() -> impl IntoResponse {
    Json(catalog())
}

// ============================================================================
// API: Sessions
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub cameras: Vec<CameraDefinition>,
    #[serde(default)]
    pub configuration: Option<GatewayConfiguration>,
}

pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    match state.sessions.create(req.cameras, req.configuration).await {
        Ok(shared) => {
            tracing::debug!("{} active sessions", state.sessions.len().await);
            let session = shared.lock().await;
            (StatusCode::CREATED, Json(session.view())).into_response()
        }
        Err(e) => session_error_response(&e),
    }
}

pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let shared = match lookup_session(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let session = shared.lock().await;
    Json(session.view()).into_response()
}

pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if state.sessions.remove(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Session not found").into_response()
    }
}

pub async fn handle_update_configuration(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(config): Json<GatewayConfiguration>,
) -> impl IntoResponse {
    let shared = match lookup_session(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let mut session = shared.lock().await;
    match session.reconfigure(config) {
        Ok(()) => {
            tracing::info!(
                "Session {}: configuration set to {} x {}",
                id,
                config.count,
                config.gateway_type
            );
            Json(session.view()).into_response()
        }
        Err(e) => plan_error_response(&e),
    }
}

// ============================================================================
// API: Assignment
// ============================================================================

pub async fn handle_auto_assign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let shared = match lookup_session(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let mut session = shared.lock().await;
    let unassigned = session.assignment.auto_assign();
    if !unassigned.is_empty() {
        tracing::warn!(
            "Session {}: no room for {}, more gateway capacity needed",
            id,
            unassigned.join(", ")
        );
    }
    Json(session.view()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct PlaceRequest {
    pub stream_id: String,
    pub gateway_id: String,
}

#[derive(Debug, Serialize)]
pub struct PlacementResponse {
    pub placement: Placement,
    pub session: SessionView,
}

pub async fn handle_place_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PlaceRequest>,
) -> impl IntoResponse {
    let shared = match lookup_session(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let mut session = shared.lock().await;
    let gateway = match session.assignment.parse_gateway_id(&req.gateway_id) {
        Ok(g) => g,
        Err(e) => return plan_error_response(&e),
    };

    match session.assignment.try_place(&req.stream_id, gateway) {
        Ok(placement) => {
            let status = if placement.is_placed() {
                StatusCode::OK
            } else {
                StatusCode::CONFLICT
            };
            let body = PlacementResponse {
                placement,
                session: session.view(),
            };
            (status, Json(body)).into_response()
        }
        Err(e) => plan_error_response(&e),
    }
}

pub async fn handle_remove_stream(
    State(state): State<AppState>,
    Path((id, stream_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let shared = match lookup_session(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let mut session = shared.lock().await;
    match session.assignment.remove_stream(&stream_id) {
        Ok(_) => Json(session.view()).into_response(),
        Err(e) => plan_error_response(&e),
    }
}

pub async fn handle_clear_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let shared = match lookup_session(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let mut session = shared.lock().await;
    session.assignment.clear_all();
    Json(session.view()).into_response()
}

// ============================================================================
// API: Plans
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub id: i64,
    pub name: String,
    pub gateway_type: String,
    pub gateway_count: i64,
    pub stream_count: i64,
    pub created_at: DateTime<Utc>,
    pub document: serde_json::Value,
}

impl PlanResponse {
    /// Fails when the stored document is not valid JSON.
    fn from_saved(plan: SavedPlan) -> Result<Self, serde_json::Error> {
        let document = serde_json::from_str(&plan.document)?;
        Ok(Self {
            id: plan.id,
            name: plan.name,
            gateway_type: plan.gateway_type,
            gateway_count: plan.gateway_count,
            stream_count: plan.stream_count,
            created_at: plan.created_at,
            document,
        })
    }
}

fn plan_response(plan: SavedPlan, status: StatusCode) -> Response {
    let plan_id = plan.id;
    match PlanResponse::from_saved(plan) {
        Ok(resp) => (status, Json(resp)).into_response(),
        Err(e) => {
            tracing::error!("Plan #{}: stored document is corrupt: {}", plan_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("plan #{} has a corrupt document", plan_id),
            )
                .into_response()
        }
    }
}

pub async fn handle_export_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ExportRequest>,
) -> impl IntoResponse {
    let shared = match lookup_session(&state, &id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let export = {
        let session = shared.lock().await;
        match session.export(&req.name) {
            Ok(export) => export,
            Err(e) => return plan_error_response(&e),
        }
    };

    let document = match serde_json::to_string(&export) {
        Ok(doc) => doc,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let mut plan = SavedPlan {
        id: 0,
        name: export.name.clone(),
        gateway_type: export.configuration.gateway_type.to_string(),
        gateway_count: i64::from(export.configuration.count),
        stream_count: export.streams.len() as i64,
        document,
        created_at: export.exported_at,
    };

    match state.store.save_plan(&mut plan) {
        Ok(plan_id) => {
            tracing::info!("Session {}: exported plan {} as #{}", id, plan.name, plan_id);
            plan_response(plan, StatusCode::CREATED)
        }
        Err(e) => db_error_response(&e),
    }
}

pub async fn handle_get_plans(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_plans() {
        Ok(plans) => Json(plans).into_response(),
        Err(e) => db_error_response(&e),
    }
}

pub async fn handle_get_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.get_plan(id) {
        Ok(plan) => plan_response(plan, StatusCode::OK),
        Err(e) => db_error_response(&e),
    }
}

pub async fn handle_delete_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.delete_plan(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => db_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::db::Store;
    use crate::session::SessionRegistry;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn test_state(tmp: &NamedTempFile) -> AppState {
        AppState {
            config: ServerConfig::default(),
            store: Arc::new(Store::new(tmp.path()).unwrap()),
            sessions: Arc::new(SessionRegistry::new(8, chrono::Duration::hours(1))),
        }
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn create_request(lens_count: u32) -> CreateSessionRequest {
        CreateSessionRequest {
            cameras: vec![CameraDefinition {
                name: "Lobby".to_string(),
                lens_count,
                streaming_resolution: 2.0,
                frame_rate: 10,
                recording_resolution: 2.0,
                storage_days: 30,
            }],
            configuration: None,
        }
    }

    async fn create_session(state: &AppState) -> String {
        let resp = handle_create_session(State(state.clone()), Json(create_request(2)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["calculations"]["total_streams"], 2);
        assert_eq!(body["recommendation"]["type"], "8ch");
        assert_eq!(body["state"], "unassigned");
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_create_session_rejects_invalid_camera() {
        let tmp = NamedTempFile::new().unwrap();
        let state = test_state(&tmp);

        let resp = handle_create_session(State(state), Json(create_request(7)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_manual_placement_flow() {
        let tmp = NamedTempFile::new().unwrap();
        let state = test_state(&tmp);
        let id = create_session(&state).await;

        let req = PlaceRequest {
            stream_id: "0-0".to_string(),
            gateway_id: "0".to_string(),
        };
        let resp = handle_place_stream(State(state.clone()), Path(id.clone()), Json(req))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["placement"]["outcome"], "placed");
        assert_eq!(body["session"]["state"], "partially_assigned");

        let req = PlaceRequest {
            stream_id: "0-1".to_string(),
            gateway_id: "3".to_string(),
        };
        let resp = handle_place_stream(State(state.clone()), Path(id.clone()), Json(req))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = handle_remove_stream(State(state.clone()), Path((id.clone(), "0-0".to_string())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["state"], "unassigned");
    }

    #[tokio::test]
    async fn test_underflow_override_is_rejected() {
        let tmp = NamedTempFile::new().unwrap();
        let state = test_state(&tmp);

        let mut req = create_request(4);
        req.cameras[0].storage_days = 365;
        // 2MP kept for a year is 7.884 TB per stream
        let resp = handle_create_session(State(state.clone()), Json(req))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["recommendation"]["type"], "16ch");
        assert_eq!(body["recommendation"]["count"], 3);
        let id = body["id"].as_str().unwrap().to_string();

        let config = GatewayConfiguration::new(crate::planner::GatewayType::SixteenChannel, 2);
        let resp = handle_update_configuration(State(state), Path(id), Json(config))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_flow() {
        let tmp = NamedTempFile::new().unwrap();
        let state = test_state(&tmp);
        let id = create_session(&state).await;

        let export = || ExportRequest {
            name: "HQ".to_string(),
        };

        // Not assigned yet
        let resp = handle_export_plan(State(state.clone()), Path(id.clone()), Json(export()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["unassigned"].as_array().unwrap().len(), 2);

        let resp = handle_auto_assign(State(state.clone()), Path(id.clone()))
            .await
            .into_response();
        assert_eq!(body_json(resp).await["state"], "fully_assigned");

        let resp = handle_export_plan(State(state.clone()), Path(id.clone()), Json(export()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["gateway_type"], "8ch");
        assert_eq!(body["document"]["assignment"]["0"].as_array().unwrap().len(), 2);
        let plan_id = body["id"].as_i64().unwrap();

        let resp = handle_get_plan(State(state.clone()), Path(plan_id)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = handle_delete_plan(State(state.clone()), Path(plan_id)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = handle_get_plan(State(state), Path(plan_id)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_corrupt_plan_document_is_a_server_error() {
        let tmp = NamedTempFile::new().unwrap();
        let state = test_state(&tmp);

        let mut plan = SavedPlan {
            name: "Broken".to_string(),
            gateway_type: "8ch".to_string(),
            gateway_count: 1,
            stream_count: 2,
            document: "not json".to_string(),
            ..Default::default()
        };
        let plan_id = state.store.save_plan(&mut plan).unwrap();

        let resp = handle_get_plan(State(state.clone()), Path(plan_id)).await.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // The listing never parses documents
        let resp = handle_get_plans(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_count_beyond_stream_count_is_rejected() {
        let tmp = NamedTempFile::new().unwrap();
        let state = test_state(&tmp);
        let id = create_session(&state).await;

        for count in [3, u32::MAX] {
            let config = GatewayConfiguration::new(crate::planner::GatewayType::EightChannel, count);
            let resp = handle_update_configuration(State(state.clone()), Path(id.clone()), Json(config))
                .await
                .into_response();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        let resp = handle_get_session(State(state), Path(id)).await.into_response();
        assert_eq!(body_json(resp).await["configuration"]["count"], 1);
    }

    #[tokio::test]
    async fn test_missing_session() {
        let tmp = NamedTempFile::new().unwrap();
        let state = test_state(&tmp);

        let resp = handle_get_session(State(state.clone()), Path("missing".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = handle_delete_session(State(state), Path("missing".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
