// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # External Workflow Runtime Port
//!
//! Some tasks live in an external BPMN-style runtime rather than in the
//! registry. That runtime is opaque: it is reached only through the
//! [`WorkflowRuntime`] trait, and its tasks keep their own schema
//! ([`ExternalTask`]) instead of being squeezed into the native [`Task`].
//!
//! [`WorkItem`] is the tagged union handed out at the task store boundary.
//! It serializes with an `origin` discriminator:
//!
//! ```json
//! { "origin": "REGISTRY_NATIVE", "id": "…", "caseId": "…", … }
//! { "origin": "EXTERNAL_WORKFLOW", "id": "4711", "processInstanceId": "…", … }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::domain::case::{Case, CaseId};
use crate::domain::error::CaseflowError;
use crate::domain::task::{Task, TaskStatus};
use crate::domain::user::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalTaskId(pub String);

impl fmt::Display for ExternalTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTask {
    pub id: ExternalTaskId,
    pub name: String,
    pub description: Option<String>,
    pub assignee: Option<UserId>,
    #[serde(default)]
    pub candidate_groups: Vec<String>,
    pub process_instance_id: String,
    pub task_definition_key: Option<String>,
    /// Owning case, when the runtime carries it as a process variable
    pub case_id: Option<CaseId>,
    pub created_at: DateTime<Utc>,
}

impl ExternalTask {
    /// External tasks disappear from the runtime once completed, so anything
    /// we can still see is active.
    pub fn status(&self) -> TaskStatus {
        if self.assignee.is_some() {
            TaskStatus::Claimed
        } else {
            TaskStatus::Open
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskOrigin {
    RegistryNative,
    ExternalWorkflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkItem {
    RegistryNative(Task),
    ExternalWorkflow(ExternalTask),
}

impl WorkItem {
    pub fn origin(&self) -> TaskOrigin {
        match self {
            WorkItem::RegistryNative(_) => TaskOrigin::RegistryNative,
            WorkItem::ExternalWorkflow(_) => TaskOrigin::ExternalWorkflow,
        }
    }

    pub fn id(&self) -> String {
        match self {
            WorkItem::RegistryNative(task) => task.id.to_string(),
            WorkItem::ExternalWorkflow(task) => task.id.to_string(),
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            WorkItem::RegistryNative(task) => task.status,
            WorkItem::ExternalWorkflow(task) => task.status(),
        }
    }

    pub fn assignee(&self) -> Option<&UserId> {
        match self {
            WorkItem::RegistryNative(task) => task.assignee.as_ref(),
            WorkItem::ExternalWorkflow(task) => task.assignee.as_ref(),
        }
    }

    pub fn case_id(&self) -> Option<CaseId> {
        match self {
            WorkItem::RegistryNative(task) => Some(task.case_id),
            WorkItem::ExternalWorkflow(task) => task.case_id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            WorkItem::RegistryNative(task) => task.created_at,
            WorkItem::ExternalWorkflow(task) => task.created_at,
        }
    }
}

/// Request to start the external process that follows case approval
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStartRequest {
    pub process_definition_key: String,
    pub business_key: String,
    pub variables: Map<String, Value>,
}

impl ProcessStartRequest {
    pub fn for_case(case: &Case, process_definition_key: &str) -> Self {
        let mut variables = Map::new();
        variables.insert("caseId".into(), Value::String(case.id.to_string()));
        variables.insert("caseNumber".into(), Value::String(case.case_number.clone()));
        variables.insert(
            "caseType".into(),
            case.case_type.map(|t| Value::String(t.as_str().into())).unwrap_or(Value::Null),
        );
        variables.insert(
            "priority".into(),
            case.priority.map(|p| Value::String(p.as_str().into())).unwrap_or(Value::Null),
        );
        variables.insert("createdBy".into(), Value::String(case.created_by.to_string()));
        variables.insert("requiresApproval".into(), Value::Bool(case.requires_escalated_review()));

        Self {
            process_definition_key: process_definition_key.to_string(),
            business_key: case.case_number.clone(),
            variables,
        }
    }
}

/// Adapter to the external workflow runtime
#[async_trait]
pub trait WorkflowRuntime: Send + Sync {
    /// Start a process instance, returning its opaque reference
    async fn start_case_process(&self, request: &ProcessStartRequest) -> Result<String, CaseflowError>;

    async fn tasks_for_assignee(&self, assignee: &UserId) -> Result<Vec<ExternalTask>, CaseflowError>;

    /// Unassigned tasks offered to a candidate group
    async fn tasks_for_group(&self, group: &str) -> Result<Vec<ExternalTask>, CaseflowError>;

    /// Active tasks of one process instance
    async fn tasks_for_process(&self, process_instance_id: &str) -> Result<Vec<ExternalTask>, CaseflowError>;

    async fn find_task(&self, id: &ExternalTaskId) -> Result<Option<ExternalTask>, CaseflowError>;

    async fn set_assignee(&self, id: &ExternalTaskId, assignee: Option<&UserId>) -> Result<(), CaseflowError>;

    async fn complete_task(&self, id: &ExternalTaskId, variables: Map<String, Value>) -> Result<(), CaseflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::case::{CaseFields, CaseType, Priority};

    #[test]
    fn test_work_item_serializes_origin_tag() {
        let external = ExternalTask {
            id: ExternalTaskId("4711".into()),
            name: "Collect KYC documents".into(),
            description: None,
            assignee: None,
            candidate_groups: vec!["Investigations".into()],
            process_instance_id: "proc-1".into(),
            task_definition_key: Some("collectKyc".into()),
            case_id: None,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(WorkItem::ExternalWorkflow(external)).unwrap();
        assert_eq!(value["origin"], "EXTERNAL_WORKFLOW");
        assert_eq!(value["processInstanceId"], "proc-1");
    }

    #[test]
    fn test_process_variables_flag_escalation() {
        let fields = CaseFields {
            case_type: Some(CaseType::Aml),
            priority: Some(Priority::Low),
            risk_score: Some(92.0),
            description: Some("Rapid movement of funds".into()),
            ..Default::default()
        };
        let case = Case::open("CASE-2026-0007".into(), fields, UserId::parse("analyst1").unwrap()).unwrap();
        let request = ProcessStartRequest::for_case(&case, "caseInvestigationProcess");
        assert_eq!(request.business_key, "CASE-2026-0007");
        assert_eq!(request.variables["requiresApproval"], Value::Bool(true));
        assert_eq!(request.variables["caseType"], "AML");
    }
}
