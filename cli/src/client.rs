// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for a running Caseflow server
//!
//! Every request carries the acting user in the `X-Caseflow-User` header.
//! Transport failures surface as [`ClientError::Network`]; error bodies from
//! the server are decoded into [`ClientError::Api`].

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use caseflow_core::domain::audit::AuditLogEntry;
use caseflow_core::domain::case::{Case, CaseFields};
use caseflow_core::domain::workflow_runtime::WorkItem;
use caseflow_core::presentation::USER_HEADER;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error talking to {url}: {message}")]
    Network { url: String, message: String },

    #[error("{code} (HTTP {status}): {message}")]
    Api { status: u16, code: String, message: String },

    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Filters accepted by `GET /api/cases`
#[derive(Debug, Default, Clone)]
pub struct CaseQuery {
    pub status: Option<String>,
    pub created_by: Option<String>,
    pub case_type: Option<String>,
    pub priority: Option<String>,
}

impl CaseQuery {
    fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("status", self.status.as_deref()),
            ("createdBy", self.created_by.as_deref()),
            ("caseType", self.case_type.as_deref()),
            ("priority", self.priority.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

#[derive(Debug, Clone)]
pub struct CaseflowClient {
    client: Client,
    base_url: String,
    user: String,
}

impl CaseflowClient {
    pub fn new(base_url: impl Into<String>, user: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder().build().map_err(|e| ClientError::Network {
            url: base_url.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            client,
            base_url,
            user: user.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T, ClientError> {
        let response = request
            .header(USER_HEADER, &self.user)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                url: self.url(path),
                message: e.to_string(),
            })?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if !status.is_success() {
            return Err(match serde_json::from_slice::<ErrorBody>(&bytes) {
                Ok(body) => ClientError::Api {
                    status: status.as_u16(),
                    code: body.code,
                    message: body.message,
                },
                Err(_) => ClientError::Api {
                    status: status.as_u16(),
                    code: "HTTP_ERROR".to_string(),
                    message: String::from_utf8_lossy(&bytes).into_owned(),
                },
            });
        }
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.send(self.client.get(self.url("/health")), "/health").await
    }

    pub async fn list_cases(&self, query: &CaseQuery) -> Result<Vec<Case>, ClientError> {
        let path = "/api/cases";
        self.send(self.client.get(self.url(path)).query(&query.pairs()), path)
            .await
    }

    /// Fetch by id or case number
    pub async fn get_case(&self, reference: &str) -> Result<Case, ClientError> {
        let path = format!("/api/cases/{}", reference);
        self.send(self.client.get(self.url(&path)), &path).await
    }

    pub async fn create_case(&self, fields: &CaseFields) -> Result<Case, ClientError> {
        let path = "/api/cases";
        self.send(self.client.post(self.url(path)).json(fields), path).await
    }

    pub async fn abandon_case(&self, case_id: &str, reason: &str) -> Result<Case, ClientError> {
        let path = format!("/api/cases/abandon/{}", case_id);
        self.send(
            self.client.put(self.url(&path)).json(&json!({ "reason": reason })),
            &path,
        )
        .await
    }

    pub async fn tasks_for_assignee(&self, user: &str) -> Result<Vec<WorkItem>, ClientError> {
        let path = format!("/api/tasks/by-assignee/{}", user);
        self.send(self.client.get(self.url(&path)), &path).await
    }

    pub async fn tasks_for_group(&self, group: &str) -> Result<Vec<WorkItem>, ClientError> {
        let path = format!("/api/tasks/group/{}", group);
        self.send(self.client.get(self.url(&path)), &path).await
    }

    pub async fn claim_task(&self, task_id: &str) -> Result<WorkItem, ClientError> {
        let path = format!("/api/tasks/claim/{}", task_id);
        self.send(self.client.put(self.url(&path)), &path).await
    }

    /// Approve or reject; the response is either a decision receipt or a
    /// claim-required signal, distinguished by its `outcome` field
    pub async fn decide(
        &self,
        task_id: &str,
        case_id: &str,
        approved: bool,
        comments: &str,
        claim_confirmed: bool,
    ) -> Result<Value, ClientError> {
        let path = format!("/api/tasks/{}/approve-case", task_id);
        let body = json!({
            "caseId": case_id,
            "approved": approved,
            "comments": comments,
            "claimConfirmed": claim_confirmed,
        });
        self.send(self.client.put(self.url(&path)).json(&body), &path).await
    }

    pub async fn audit(&self, case_ref: &str) -> Result<Vec<AuditLogEntry>, ClientError> {
        let path = format!("/api/audit/{}", case_ref);
        self.send(self.client.get(self.url(&path)), &path).await
    }
}
