// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

//! REST surface driven through the router without binding a socket.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use caseflow_core::domain::case::CaseFields;
use caseflow_core::presentation::{app, USER_HEADER};
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

use common::{actor, services};

async fn router() -> Router {
    app(services().await)
}

async fn call(router: &Router, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn full_case_body() -> Value {
    json!({
        "caseType": "MONEY_LAUNDERING",
        "priority": "HIGH",
        "riskScore": 72.5,
        "entity": "Northwind Trading",
        "description": "Repeated cash deposits just under the reporting threshold"
    })
}

#[tokio::test]
async fn test_health_needs_no_user() {
    let router = router().await;
    let (status, body) = call(&router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_unknown_or_missing_user_is_forbidden() {
    let router = router().await;
    let (status, body) = call(&router, Method::GET, "/api/cases", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PERMISSION_DENIED");

    let (status, _) = call(&router, Method::GET, "/api/cases", Some("mallory"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_current_user() {
    let router = router().await;
    let (status, body) = call(&router, Method::GET, "/api/users/me", Some("admin1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "admin1");
    assert_eq!(body["role"], "ADMIN");
    assert_eq!(body["displayName"], "Sarah Admin");
}

#[tokio::test]
async fn test_create_then_fetch_by_number() {
    let router = router().await;
    let (status, created) = call(&router, Method::POST, "/api/cases", Some("analyst1"), Some(full_case_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "PENDING_CASE_CREATION_APPROVAL");
    assert_eq!(created["createdBy"], "analyst1");

    let number = created["caseNumber"].as_str().unwrap();
    let (status, fetched) = call(&router, Method::GET, &format!("/api/cases/{}", number), Some("admin1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);
}

#[tokio::test]
async fn test_validation_errors_render_as_bad_request() {
    let router = router().await;
    let (status, body) = call(
        &router,
        Method::POST,
        "/api/cases",
        Some("analyst1"),
        Some(json!({ "description": "x", "riskScore": 140.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("Risk score"));

    let (status, _) = call(
        &router,
        Method::GET,
        "/api/cases?status=NOT_A_STATUS",
        Some("admin1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_draft_abandon_over_http() {
    let router = router().await;
    let (_, draft) = call(
        &router,
        Method::POST,
        "/api/cases",
        Some("analyst1"),
        Some(json!({ "description": "Wire pattern, details pending" })),
    )
    .await;
    assert_eq!(draft["status"], "DRAFT");
    let uri = format!("/api/cases/abandon/{}", draft["id"].as_str().unwrap());

    let (status, body) = call(&router, Method::PUT, &uri, Some("analyst2"), Some(json!({ "reason": "dup" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["actor"], "analyst2");

    let (status, _) = call(&router, Method::PUT, &uri, Some("analyst1"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&router, Method::PUT, &uri, Some("analyst1"), Some(json!({ "reason": "dup" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ABANDONED");

    let (status, body) = call(&router, Method::PUT, &uri, Some("analyst1"), Some(json!({ "reason": "dup" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["details"]["actual"], "ABANDONED");
}

#[tokio::test]
async fn test_complete_draft_over_http() {
    let router = router().await;
    let (_, draft) = call(
        &router,
        Method::POST,
        "/api/cases",
        Some("analyst1"),
        Some(json!({ "description": "Wire pattern, details pending" })),
    )
    .await;
    let uri = format!("/api/cases/{}?action=complete", draft["id"].as_str().unwrap());

    let (status, body) = call(&router, Method::PUT, &uri, Some("analyst1"), Some(full_case_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING_CASE_CREATION_APPROVAL");

    let bad = format!("/api/cases/{}?action=explode", draft["id"].as_str().unwrap());
    let (status, _) = call(&router, Method::PUT, &bad, Some("analyst1"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mutations_accept_case_numbers() {
    let router = router().await;
    let mut numbers = Vec::new();
    for description in ["First draft", "Second draft", "Third draft"] {
        let (_, draft) = call(
            &router,
            Method::POST,
            "/api/cases",
            Some("analyst1"),
            Some(json!({ "description": description })),
        )
        .await;
        numbers.push(draft["caseNumber"].as_str().unwrap().to_string());
    }

    let uri = format!("/api/cases/{}?action=complete", numbers[0]);
    let (status, body) = call(&router, Method::PUT, &uri, Some("analyst1"), Some(full_case_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING_CASE_CREATION_APPROVAL");

    let uri = format!("/api/cases/abandon/{}", numbers[1]);
    let (status, body) = call(&router, Method::PUT, &uri, Some("analyst1"), Some(json!({ "reason": "dup" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ABANDONED");

    let uri = format!("/api/cases/{}", numbers[2]);
    let (status, _) = call(&router, Method::DELETE, &uri, Some("analyst1"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&router, Method::GET, &uri, Some("analyst1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/tasks/create/{}", numbers[0]);
    let (status, body) = call(
        &router,
        Method::POST,
        &uri,
        Some("admin1"),
        Some(json!({ "title": "Pull statements" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Pull statements");
}

#[tokio::test]
async fn test_decision_flow_over_http() {
    let router = router().await;
    let (_, case) = call(&router, Method::POST, "/api/cases", Some("analyst1"), Some(full_case_body())).await;
    let case_id = case["id"].as_str().unwrap().to_string();

    let (status, pooled) = call(&router, Method::GET, "/api/tasks/group/Supervisors", Some("admin1"), None).await;
    assert_eq!(status, StatusCode::OK);
    let task = &pooled.as_array().unwrap()[0];
    assert_eq!(task["origin"], "REGISTRY_NATIVE");
    assert_eq!(task["kind"], "APPROVE_CASE_CREATION");
    let decide_uri = format!("/api/tasks/{}/approve-case", task["id"].as_str().unwrap());

    let (status, body) = call(
        &router,
        Method::PUT,
        &decide_uri,
        Some("analyst1"),
        Some(json!({ "caseId": case_id, "approved": true, "comments": "ok" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PERMISSION_DENIED");

    let (status, body) = call(
        &router,
        Method::PUT,
        &decide_uri,
        Some("admin1"),
        Some(json!({ "caseId": case_id, "approved": true, "comments": "ok" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "CLAIM_REQUIRED");

    let (status, body) = call(
        &router,
        Method::PUT,
        &decide_uri,
        Some("admin1"),
        Some(json!({ "caseId": case_id, "approved": true, "comments": "ok", "claimConfirmed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "DECIDED");
    assert_eq!(body["case"]["status"], "READY_FOR_ASSIGNMENT");
    assert_eq!(body["auditEntry"]["action"], "CASE_APPROVED");
    assert_eq!(body["followOnTask"]["kind"], "INVESTIGATE_CASE");

    let (status, body) = call(
        &router,
        Method::PUT,
        &decide_uri,
        Some("admin2"),
        Some(json!({ "caseId": case_id, "approved": false, "comments": "no", "claimConfirmed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, audit) = call(&router, Method::GET, &format!("/api/audit/{}", case_id), Some("admin1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit[0]["action"], "CASE_APPROVED");
}

#[tokio::test]
async fn test_claim_and_complete_task_over_http() {
    let router = router().await;
    let (_, case) = call(&router, Method::POST, "/api/cases", Some("analyst1"), Some(full_case_body())).await;
    let case_id = case["id"].as_str().unwrap();

    let (status, task) = call(
        &router,
        Method::POST,
        &format!("/api/tasks/create/{}", case_id),
        Some("admin1"),
        Some(json!({ "title": "Collect KYC file", "candidateGroup": "Investigations" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = task["id"].as_str().unwrap();

    let (status, claimed) = call(&router, Method::PUT, &format!("/api/tasks/claim/{}", task_id), Some("analyst2"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claimed["assignee"], "analyst2");

    let (status, mine) = call(&router, Method::GET, "/api/tasks/by-assignee/analyst2", Some("analyst2"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, done) = call(
        &router,
        Method::POST,
        "/api/tasks/complete",
        Some("analyst2"),
        Some(json!({ "taskId": task_id, "comments": "file attached" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "COMPLETED");

    let (status, _) = call(&router, Method::GET, "/api/tasks/not-a-task", Some("admin1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_admins_manage_users() {
    let router = router().await;
    let body = json!({ "id": "analyst3", "displayName": "New Analyst", "role": "analyst" });

    let (status, _) = call(&router, Method::POST, "/api/users", Some("analyst1"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = call(&router, Method::POST, "/api/users", Some("admin1"), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "ANALYST");

    let (status, users) = call(&router, Method::GET, "/api/users", Some("analyst3"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 5);
}

/// Open `/api/events` and hand back the body as a stream of text chunks
async fn open_events(router: &Router, user: &str) -> axum::body::BodyDataStream {
    let request = Request::builder()
        .uri("/api/events")
        .header(USER_HEADER, user)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.into_body().into_data_stream()
}

/// Read until `needle` shows up, returning everything seen so far
async fn read_until(stream: &mut axum::body::BodyDataStream, needle: &str) -> String {
    let mut seen = String::new();
    while !seen.contains(needle) {
        let chunk = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .unwrap_or_else(|_| panic!("no event mentioning {} within 2s, got: {}", needle, seen))
            .expect("event stream ended")
            .unwrap();
        seen.push_str(&String::from_utf8_lossy(&chunk));
    }
    seen
}

fn draft(description: &str) -> CaseFields {
    CaseFields {
        description: Some(description.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_event_stream_hides_cases_the_user_cannot_see() {
    let services = services().await;
    let router = app(services.clone());
    let mut analyst_stream = open_events(&router, "analyst2").await;
    let mut admin_stream = open_events(&router, "admin1").await;

    let foreign = services.cases.create(draft("Shell company layering"), &actor("analyst1")).await.unwrap();
    let own = services.cases.create(draft("Structuring at one branch"), &actor("analyst2")).await.unwrap();

    let seen = read_until(&mut analyst_stream, &own.id.to_string()).await;
    assert!(!seen.contains(&foreign.id.to_string()));
    assert!(!seen.contains(&foreign.case_number));
    assert!(seen.contains("event: case"));
    assert!(seen.contains("\"event\":\"CASE_CREATED\""));

    let seen = read_until(&mut admin_stream, &own.id.to_string()).await;
    assert!(seen.contains(&foreign.id.to_string()));
}

#[tokio::test]
async fn test_event_stream_for_a_single_case_checks_visibility() {
    let services = services().await;
    let router = app(services.clone());
    let foreign = services.cases.create(draft("Shell company layering"), &actor("analyst1")).await.unwrap();

    let uri = format!("/api/events?caseId={}", foreign.case_number);
    let request = Request::builder()
        .uri(uri.as_str())
        .header(USER_HEADER, "analyst2")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .uri(uri.as_str())
        .header(USER_HEADER, "analyst1")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut stream = response.into_body().into_data_stream();

    let other = services.cases.create(draft("Unrelated"), &actor("analyst1")).await.unwrap();
    services.cases.abandon(other.id, &actor("analyst1"), "duplicate").await.unwrap();
    services.cases.abandon(foreign.id, &actor("analyst1"), "duplicate").await.unwrap();

    let seen = read_until(&mut stream, "ABANDONED").await;
    assert!(seen.contains(&foreign.id.to_string()));
    assert!(!seen.contains(&other.id.to_string()));
}
