// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # REST API
//!
//! axum router exposing cases, tasks, decisions, the audit trail, the user
//! directory and a server-sent event stream.
//!
//! The acting user is taken from the `X-Caseflow-User` header and resolved
//! through the user directory; requests without a known user are denied.
//! Failures are rendered as `{ "code", "message", "details" }` with the
//! status mapped from the error kind.

use axum::{
    body::Bytes,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Json, Router,
};
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::application::services::CaseflowServices;
use crate::application::task_store::CreateTaskRequest;
use crate::application::DecisionRequest;
use crate::domain::case::{Case, CaseFields, CaseFilter, CaseId, CaseStatus, CaseType, Priority};
use crate::domain::error::CaseflowError;
use crate::domain::permission::{authorize, Action};
use crate::domain::task::TaskId;
use crate::domain::user::{Actor, Role, User, UserId};
use crate::infrastructure::event_bus::DomainEvent;

pub const USER_HEADER: &str = "x-caseflow-user";

pub struct AppState {
    pub services: CaseflowServices,
    pub start_time: Instant,
}

pub fn app(services: CaseflowServices) -> Router {
    let state = Arc::new(AppState {
        services,
        start_time: Instant::now(),
    });

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/cases", post(create_case_handler).get(list_cases_handler))
        .route(
            "/api/cases/{id}",
            get(get_case_handler).put(update_case_handler).delete(delete_case_handler),
        )
        .route("/api/cases/abandon/{id}", put(abandon_case_handler))
        .route("/api/tasks/by-assignee/{user}", get(tasks_by_assignee_handler))
        .route("/api/tasks/group/{group}", get(tasks_by_group_handler))
        .route("/api/tasks/case/{case_id}", get(tasks_by_case_handler))
        .route("/api/tasks/assign/{id}", put(assign_task_handler))
        .route("/api/tasks/claim/{id}", put(claim_task_handler))
        .route("/api/tasks/complete", post(complete_task_handler))
        .route("/api/tasks/create/{case_id}", post(create_task_handler))
        .route("/api/tasks/{id}", get(get_task_handler))
        .route("/api/tasks/{id}/approve-case", put(decide_handler))
        .route("/api/audit/{case_id}", get(audit_handler))
        .route("/api/users", get(list_users_handler).post(create_user_handler))
        .route("/api/users/me", get(current_user_handler))
        .route("/api/events", get(events_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Errors and extraction
// ============================================================================

#[derive(Debug)]
pub struct ApiError(pub CaseflowError);

impl From<CaseflowError> for ApiError {
    fn from(err: CaseflowError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CaseflowError::Validation { .. } => StatusCode::BAD_REQUEST,
            CaseflowError::Permission { .. } => StatusCode::FORBIDDEN,
            CaseflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            CaseflowError::Conflict { .. } => StatusCode::CONFLICT,
            CaseflowError::Network(_) => StatusCode::BAD_GATEWAY,
            CaseflowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "Request failed");
        } else {
            debug!(code = self.0.code(), error = %self.0, "Request rejected");
        }
        let body = json!({
            "code": self.0.code(),
            "message": self.0.to_string(),
            "details": self.0.details(),
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// The resolved acting user
pub struct CurrentActor(pub Actor);

impl FromRequestParts<Arc<AppState>> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let actor = state.services.users.resolve(raw).await?;
        Ok(CurrentActor(actor))
    }
}

/// Decode a JSON body, reporting malformed input as a validation error
fn decode<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    let slice: &[u8] = if body.is_empty() { b"{}" } else { &body[..] };
    serde_json::from_slice(slice).map_err(|e| CaseflowError::validation(format!("invalid request body: {}", e)).into())
}

/// Cases are addressed by id or by case number
async fn load_case(state: &AppState, raw: &str, actor: &Actor) -> ApiResult<Case> {
    let cases = &state.services.cases;
    match CaseId::from_string(raw.trim()) {
        Ok(id) => Ok(cases.get(id, actor).await?),
        Err(_) => Ok(cases.find_by_number(raw.trim(), actor).await?),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Cases
// ============================================================================

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn create_case_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let fields: CaseFields = decode(&body)?;
    let case = state.services.cases.create(fields, &actor).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaseListQuery {
    status: Option<String>,
    created_by: Option<String>,
    case_type: Option<String>,
    priority: Option<String>,
}

impl CaseListQuery {
    fn into_filter(self) -> Result<CaseFilter, CaseflowError> {
        Ok(CaseFilter {
            status: non_blank(self.status).map(|s| s.parse::<CaseStatus>()).transpose()?,
            created_by: non_blank(self.created_by).map(|u| UserId::parse(&u)).transpose()?,
            case_type: non_blank(self.case_type).map(|t| t.parse::<CaseType>()).transpose()?,
            priority: non_blank(self.priority).map(|p| p.parse::<Priority>()).transpose()?,
        })
    }
}

async fn list_cases_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<CaseListQuery>,
) -> ApiResult<Json<Vec<Case>>> {
    let filter = query.into_filter()?;
    Ok(Json(state.services.cases.list(filter, &actor).await?))
}

async fn get_case_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Case>> {
    Ok(Json(load_case(&state, &id, &actor).await?))
}

#[derive(Debug, Deserialize)]
struct UpdateCaseQuery {
    action: Option<String>,
}

async fn update_case_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Query(query): Query<UpdateCaseQuery>,
    body: Bytes,
) -> ApiResult<Json<Case>> {
    let case_id = load_case(&state, &id, &actor).await?.id;
    let fields: CaseFields = decode(&body)?;
    let cases = &state.services.cases;
    let case = match query.action.as_deref().unwrap_or("complete") {
        "complete" => cases.complete(case_id, fields, &actor).await?,
        "edit" => cases.edit(case_id, fields, &actor).await?,
        other => {
            return Err(CaseflowError::validation(format!(
                "unknown action '{}', expected complete or edit",
                other
            ))
            .into())
        }
    };
    Ok(Json(case))
}

async fn delete_case_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let case_id = load_case(&state, &id, &actor).await?.id;
    state.services.cases.delete(case_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AbandonBody {
    #[serde(default)]
    reason: String,
}

async fn abandon_case_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Case>> {
    let case_id = load_case(&state, &id, &actor).await?.id;
    let AbandonBody { reason } = decode(&body)?;
    Ok(Json(state.services.cases.abandon(case_id, &actor, &reason).await?))
}

// ============================================================================
// Tasks
// ============================================================================

async fn tasks_by_assignee_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(user): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user = UserId::parse(&user)?;
    Ok(Json(state.services.tasks.by_assignee(&user, &actor).await?))
}

async fn tasks_by_group_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(group): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.tasks.by_group(&group, &actor).await?))
}

async fn tasks_by_case_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(case_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let case = load_case(&state, &case_id, &actor).await?;
    Ok(Json(state.services.tasks.by_case(case.id, &actor).await?))
}

async fn get_task_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.tasks.get(&id, &actor).await?))
}

#[derive(Debug, Deserialize)]
struct AssignBody {
    #[serde(default)]
    assignee: Option<String>,
}

async fn assign_task_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let AssignBody { assignee } = decode(&body)?;
    Ok(Json(
        state.services.tasks.assign(&id, assignee.as_deref(), &actor).await?,
    ))
}

async fn claim_task_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.services.tasks.claim(&id, &actor).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteTaskBody {
    task_id: String,
    #[serde(default)]
    comments: Option<String>,
    #[serde(default)]
    variables: Map<String, Value>,
}

async fn complete_task_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let CompleteTaskBody {
        task_id,
        comments,
        variables,
    } = decode(&body)?;
    Ok(Json(
        state
            .services
            .tasks
            .complete(&task_id, &actor, comments, variables)
            .await?,
    ))
}

async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(case_id): Path<String>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let case_id = load_case(&state, &case_id, &actor).await?.id;
    let request: CreateTaskRequest = decode(&body)?;
    let task = state.services.tasks.create(case_id, request, &actor).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionBody {
    case_id: CaseId,
    approved: bool,
    #[serde(default)]
    comments: String,
    #[serde(default)]
    claim_confirmed: bool,
}

async fn decide_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let task_id = TaskId::from_string(id.trim())
        .map_err(|_| CaseflowError::validation(format!("invalid task id: {}", id)))?;
    let body: DecisionBody = decode(&body)?;
    let request = DecisionRequest {
        task_id,
        case_id: body.case_id,
        approved: body.approved,
        comments: body.comments,
        claim_confirmed: body.claim_confirmed,
    };
    Ok(Json(state.services.approvals.decide(request, &actor).await?))
}

// ============================================================================
// Audit, users, events
// ============================================================================

async fn audit_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(case_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let case = load_case(&state, &case_id, &actor).await?;
    Ok(Json(state.services.audit.for_case(case.id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserView {
    id: UserId,
    display_name: String,
    role: Role,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            role: user.role,
        }
    }
}

async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(_actor): CurrentActor,
) -> ApiResult<Json<Vec<UserView>>> {
    let users = state.services.users.list().await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

async fn current_user_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Json<UserView>> {
    Ok(Json(state.services.users.get(&actor.id).await?.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserBody {
    id: String,
    display_name: String,
    role: String,
}

async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let body: CreateUserBody = decode(&body)?;
    let user = User {
        id: UserId::parse(&body.id)?,
        display_name: body.display_name,
        role: body.role.parse::<Role>()?,
    };
    let user = state.services.users.create(user, &actor).await?;
    Ok((StatusCode::CREATED, Json(UserView::from(user))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsQuery {
    case_id: Option<String>,
}

fn event_name(event: &DomainEvent) -> &'static str {
    match event {
        DomainEvent::Case(_) => "case",
        DomainEvent::Task(_) => "task",
        DomainEvent::Decision(_) => "decision",
    }
}

/// Live domain events, optionally narrowed to one case. Users without
/// VIEW_ALL_CASES only receive events for cases they can see. Receivers that
/// fall behind skip the events they missed.
async fn events_handler(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let bus = &state.services.event_bus;
    let events: BoxStream<'static, DomainEvent> = match non_blank(query.case_id) {
        Some(raw) => {
            let case = load_case(&state, &raw, &actor).await?;
            bus.subscribe_case(case.id).into_stream().boxed()
        }
        None if authorize(actor.role, Action::ViewAllCases) => bus.subscribe().into_stream().boxed(),
        None => {
            let state = state.clone();
            bus.subscribe()
                .into_stream()
                .filter_map(move |event| {
                    let state = state.clone();
                    let actor = actor.clone();
                    async move {
                        let visible = visible_to(&state, &event, &actor).await;
                        visible.then_some(event)
                    }
                })
                .boxed()
        }
    };
    debug!(subscribers = bus.subscriber_count(), "Event stream opened");

    let stream = events.map(|event| Event::default().event(event_name(&event)).json_data(&event));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Same rule as reading the case: events without a case are not shown
async fn visible_to(state: &AppState, event: &DomainEvent, actor: &Actor) -> bool {
    match event.case_id() {
        Some(case_id) => state.services.cases.get(case_id, actor).await.is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (CaseflowError::validation("bad"), StatusCode::BAD_REQUEST),
            (CaseflowError::permission("analyst1", "no"), StatusCode::FORBIDDEN),
            (
                CaseflowError::not_found(crate::domain::error::EntityKind::Case, "x"),
                StatusCode::NOT_FOUND,
            ),
            (CaseflowError::Network("down".into()), StatusCode::BAD_GATEWAY),
            (CaseflowError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn test_list_query_rejects_unknown_status() {
        let query = CaseListQuery {
            status: Some("CLOSED".into()),
            ..Default::default()
        };
        assert!(query.into_filter().is_err());

        let query = CaseListQuery {
            status: Some("DRAFT".into()),
            priority: Some(" ".into()),
            ..Default::default()
        };
        let filter = query.into_filter().unwrap();
        assert!(filter.priority.is_none());
    }
}
