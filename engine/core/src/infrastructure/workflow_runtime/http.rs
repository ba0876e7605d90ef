// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

// Flowable-style REST adapter
//
// Anti-corruption layer for an external BPMN engine exposing
// `/runtime/process-instances` and `/runtime/tasks`. Engine task payloads are
// translated into `ExternalTask`; the owning case id is read from the
// `caseId` process variable when present.
//
// Transport failures and non-success responses surface as
// `CaseflowError::Network`. A 404 on a task lookup is a missing task.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::case::CaseId;
use crate::domain::error::{CaseflowError, EntityKind};
use crate::domain::user::UserId;
use crate::domain::workflow_runtime::{ExternalTask, ExternalTaskId, ProcessStartRequest, WorkflowRuntime};

pub struct HttpWorkflowRuntime {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, Option<String>)>,
}

#[derive(Serialize)]
struct RestVariable<'a> {
    name: &'a str,
    value: &'a Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartProcessRequest<'a> {
    process_definition_key: &'a str,
    business_key: &'a str,
    variables: Vec<RestVariable<'a>>,
}

#[derive(Deserialize)]
struct ProcessInstanceResponse {
    id: String,
}

#[derive(Serialize)]
struct TaskActionRequest<'a> {
    action: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    variables: Vec<RestVariable<'a>>,
}

#[derive(Serialize)]
struct AssigneeUpdate<'a> {
    assignee: Option<&'a str>,
}

#[derive(Deserialize)]
struct TaskPage {
    data: Vec<RestTask>,
}

#[derive(Deserialize)]
struct RestTaskVariable {
    name: String,
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestTask {
    id: String,
    name: Option<String>,
    description: Option<String>,
    assignee: Option<String>,
    process_instance_id: Option<String>,
    task_definition_key: Option<String>,
    create_time: Option<String>,
    #[serde(default)]
    variables: Vec<RestTaskVariable>,
}

fn parse_engine_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl RestTask {
    fn into_external(self, candidate_groups: Vec<String>) -> ExternalTask {
        let case_id = self
            .variables
            .iter()
            .find(|v| v.name == "caseId")
            .and_then(|v| v.value.as_str())
            .and_then(|raw| CaseId::from_string(raw).ok());

        ExternalTask {
            id: ExternalTaskId(self.id),
            name: self.name.unwrap_or_default(),
            description: self.description,
            assignee: self.assignee.as_deref().and_then(|a| UserId::parse(a).ok()),
            candidate_groups,
            process_instance_id: self.process_instance_id.unwrap_or_default(),
            task_definition_key: self.task_definition_key,
            case_id,
            created_at: self
                .create_time
                .as_deref()
                .and_then(parse_engine_time)
                .unwrap_or_else(Utc::now),
        }
    }
}

fn network(e: reqwest::Error) -> CaseflowError {
    CaseflowError::Network(e.to_string())
}

impl HttpWorkflowRuntime {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.credentials = Some((username.into(), password));
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, password.as_deref()),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CaseflowError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(CaseflowError::Network(format!("workflow runtime returned HTTP {}: {}", status, body)))
    }

    async fn query_tasks(&self, params: &[(&str, &str)]) -> Result<Vec<RestTask>, CaseflowError> {
        let response = self
            .authorize(self.client.get(self.url("/runtime/tasks")))
            .query(params)
            .query(&[("includeProcessVariables", "true")])
            .send()
            .await
            .map_err(network)?;
        let page: TaskPage = Self::check(response).await?.json().await.map_err(network)?;
        Ok(page.data)
    }

    fn task_missing(id: &ExternalTaskId) -> CaseflowError {
        CaseflowError::not_found(EntityKind::ExternalTask, id)
    }
}

#[async_trait]
impl WorkflowRuntime for HttpWorkflowRuntime {
    async fn start_case_process(&self, request: &ProcessStartRequest) -> Result<String, CaseflowError> {
        let body = StartProcessRequest {
            process_definition_key: &request.process_definition_key,
            business_key: &request.business_key,
            variables: request
                .variables
                .iter()
                .map(|(name, value)| RestVariable { name, value })
                .collect(),
        };

        let response = self
            .authorize(self.client.post(self.url("/runtime/process-instances")))
            .json(&body)
            .send()
            .await
            .map_err(network)?;
        let instance: ProcessInstanceResponse = Self::check(response).await?.json().await.map_err(network)?;

        debug!(
            process_instance_id = %instance.id,
            business_key = %request.business_key,
            "Started external process"
        );
        Ok(instance.id)
    }

    async fn tasks_for_assignee(&self, assignee: &UserId) -> Result<Vec<ExternalTask>, CaseflowError> {
        let tasks = self.query_tasks(&[("assignee", assignee.as_str())]).await?;
        Ok(tasks.into_iter().map(|t| t.into_external(Vec::new())).collect())
    }

    async fn tasks_for_group(&self, group: &str) -> Result<Vec<ExternalTask>, CaseflowError> {
        let tasks = self
            .query_tasks(&[("candidateGroup", group), ("unassigned", "true")])
            .await?;
        Ok(tasks
            .into_iter()
            .map(|t| t.into_external(vec![group.to_string()]))
            .collect())
    }

    async fn tasks_for_process(&self, process_instance_id: &str) -> Result<Vec<ExternalTask>, CaseflowError> {
        let tasks = self.query_tasks(&[("processInstanceId", process_instance_id)]).await?;
        Ok(tasks.into_iter().map(|t| t.into_external(Vec::new())).collect())
    }

    async fn find_task(&self, id: &ExternalTaskId) -> Result<Option<ExternalTask>, CaseflowError> {
        let response = self
            .authorize(self.client.get(self.url(&format!("/runtime/tasks/{}", id))))
            .send()
            .await
            .map_err(network)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let task: RestTask = Self::check(response).await?.json().await.map_err(network)?;
        Ok(Some(task.into_external(Vec::new())))
    }

    async fn set_assignee(&self, id: &ExternalTaskId, assignee: Option<&UserId>) -> Result<(), CaseflowError> {
        let response = self
            .authorize(self.client.put(self.url(&format!("/runtime/tasks/{}", id))))
            .json(&AssigneeUpdate {
                assignee: assignee.map(|a| a.as_str()),
            })
            .send()
            .await
            .map_err(network)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Self::task_missing(id));
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn complete_task(&self, id: &ExternalTaskId, variables: Map<String, Value>) -> Result<(), CaseflowError> {
        let body = TaskActionRequest {
            action: "complete",
            variables: variables
                .iter()
                .map(|(name, value)| RestVariable { name, value })
                .collect(),
        };
        let response = self
            .authorize(self.client.post(self.url(&format!("/runtime/tasks/{}", id))))
            .json(&body)
            .send()
            .await
            .map_err(network)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Self::task_missing(id));
        }
        Self::check(response).await?;
        Ok(())
    }
}
