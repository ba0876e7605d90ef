// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

use caseflow_core::domain::case::CaseId;
use caseflow_core::domain::user::UserId;
use caseflow_core::domain::workflow_runtime::{ExternalTaskId, ProcessStartRequest, WorkflowRuntime};
use caseflow_core::infrastructure::workflow_runtime::HttpWorkflowRuntime;
use mockito::Matcher;
use serde_json::{json, Map, Value};

fn start_request(case_id: CaseId) -> ProcessStartRequest {
    let mut variables = Map::new();
    variables.insert("caseId".into(), Value::String(case_id.to_string()));
    ProcessStartRequest {
        process_definition_key: "caseInvestigationProcess".into(),
        business_key: "CASE-2026-0007".into(),
        variables,
    }
}

#[tokio::test]
async fn test_start_process_posts_variables() {
    let mut server = mockito::Server::new_async().await;
    let case_id = CaseId::new();
    let mock = server
        .mock("POST", "/runtime/process-instances")
        .match_header("authorization", Matcher::Regex("^Basic ".into()))
        .match_body(Matcher::PartialJson(json!({
            "processDefinitionKey": "caseInvestigationProcess",
            "businessKey": "CASE-2026-0007",
            "variables": [{ "name": "caseId", "value": case_id.to_string() }]
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"pi-77","businessKey":"CASE-2026-0007"}"#)
        .create_async()
        .await;

    let runtime = HttpWorkflowRuntime::new(server.url()).with_basic_auth("caseflow", Some("secret".into()));
    let process = runtime.start_case_process(&start_request(case_id)).await.unwrap();

    assert_eq!(process, "pi-77");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_group_query_maps_engine_tasks() {
    let mut server = mockito::Server::new_async().await;
    let case_id = CaseId::new();
    let body = json!({
        "data": [{
            "id": "t-1",
            "name": "Review case evidence",
            "assignee": null,
            "processInstanceId": "pi-77",
            "taskDefinitionKey": "reviewEvidence",
            "createTime": "2026-03-01T09:30:00.000+0000",
            "variables": [{ "name": "caseId", "value": case_id.to_string() }]
        }]
    });
    let mock = server
        .mock("GET", "/runtime/tasks")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("candidateGroup".into(), "Investigations".into()),
            Matcher::UrlEncoded("unassigned".into(), "true".into()),
            Matcher::UrlEncoded("includeProcessVariables".into(), "true".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let runtime = HttpWorkflowRuntime::new(server.url());
    let tasks = runtime.tasks_for_group("Investigations").await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, ExternalTaskId("t-1".into()));
    assert_eq!(tasks[0].case_id, Some(case_id));
    assert_eq!(tasks[0].process_instance_id, "pi-77");
    assert_eq!(tasks[0].candidate_groups, vec!["Investigations".to_string()]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_task_is_none_on_lookup_and_not_found_on_update() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/runtime/tasks/gone")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("PUT", "/runtime/tasks/gone")
        .with_status(404)
        .create_async()
        .await;

    let runtime = HttpWorkflowRuntime::new(server.url());
    let id = ExternalTaskId("gone".into());
    assert!(runtime.find_task(&id).await.unwrap().is_none());

    let analyst = UserId::parse("analyst1").unwrap();
    let err = runtime.set_assignee(&id, Some(&analyst)).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_complete_sends_action_and_variables() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/runtime/tasks/t-9")
        .match_body(Matcher::PartialJson(json!({
            "action": "complete",
            "variables": [{ "name": "comments", "value": "done" }]
        })))
        .with_status(200)
        .create_async()
        .await;

    let runtime = HttpWorkflowRuntime::new(format!("{}/", server.url()));
    let mut variables = Map::new();
    variables.insert("comments".into(), Value::String("done".into()));
    runtime
        .complete_task(&ExternalTaskId("t-9".into()), variables)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_engine_errors_surface_as_network_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/runtime/tasks")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("engine down")
        .create_async()
        .await;

    let runtime = HttpWorkflowRuntime::new(server.url());
    let analyst = UserId::parse("analyst1").unwrap();
    let err = runtime.tasks_for_assignee(&analyst).await.unwrap_err();
    assert_eq!(err.code(), "NETWORK_ERROR");
    assert!(err.to_string().contains("engine down"));
}

#[tokio::test]
async fn test_unreachable_engine_is_a_network_error() {
    let runtime = HttpWorkflowRuntime::new("http://127.0.0.1:9");
    let err = runtime.tasks_for_process("pi-1").await.unwrap_err();
    assert_eq!(err.code(), "NETWORK_ERROR");
}
