// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

// In-memory workflow runtime
//
// Starting a process opens a single pooled user task carrying the case id as
// a process variable. Completed tasks disappear, as they do in a real engine.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::case::CaseId;
use crate::domain::error::{CaseflowError, EntityKind};
use crate::domain::user::UserId;
use crate::domain::workflow_runtime::{ExternalTask, ExternalTaskId, ProcessStartRequest, WorkflowRuntime};

#[derive(Debug, Clone)]
struct InitialTask {
    name: String,
    definition_key: String,
    candidate_group: String,
}

#[derive(Debug, Clone)]
pub struct CompletedExternalTask {
    pub task: ExternalTask,
    pub variables: Map<String, Value>,
}

#[derive(Clone)]
pub struct InMemoryWorkflowRuntime {
    tasks: Arc<RwLock<HashMap<ExternalTaskId, ExternalTask>>>,
    processes: Arc<RwLock<HashMap<String, ProcessStartRequest>>>,
    completed: Arc<RwLock<Vec<CompletedExternalTask>>>,
    counter: Arc<AtomicU64>,
    initial_task: InitialTask,
}

impl InMemoryWorkflowRuntime {
    pub fn new(candidate_group: impl Into<String>) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            processes: Arc::new(RwLock::new(HashMap::new())),
            completed: Arc::new(RwLock::new(Vec::new())),
            counter: Arc::new(AtomicU64::new(0)),
            initial_task: InitialTask {
                name: "Review case evidence".to_string(),
                definition_key: "reviewEvidence".to_string(),
                candidate_group: candidate_group.into(),
            },
        }
    }

    fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Put a task directly into the runtime
    pub fn seed_task(&self, task: ExternalTask) {
        self.tasks.write().insert(task.id.clone(), task);
    }

    pub fn started_processes(&self) -> Vec<(String, ProcessStartRequest)> {
        let mut processes: Vec<_> = self
            .processes
            .read()
            .iter()
            .map(|(id, req)| (id.clone(), req.clone()))
            .collect();
        processes.sort_by(|a, b| a.0.cmp(&b.0));
        processes
    }

    pub fn completed_tasks(&self) -> Vec<CompletedExternalTask> {
        self.completed.read().clone()
    }
}

#[async_trait]
impl WorkflowRuntime for InMemoryWorkflowRuntime {
    async fn start_case_process(&self, request: &ProcessStartRequest) -> Result<String, CaseflowError> {
        let process_id = format!("proc-{}", self.next_id());
        let case_id = request
            .variables
            .get("caseId")
            .and_then(Value::as_str)
            .and_then(|raw| CaseId::from_string(raw).ok());

        let task = ExternalTask {
            id: ExternalTaskId(format!("ext-{}", self.next_id())),
            name: self.initial_task.name.clone(),
            description: Some(format!("Business key {}", request.business_key)),
            assignee: None,
            candidate_groups: vec![self.initial_task.candidate_group.clone()],
            process_instance_id: process_id.clone(),
            task_definition_key: Some(self.initial_task.definition_key.clone()),
            case_id,
            created_at: Utc::now(),
        };

        self.processes.write().insert(process_id.clone(), request.clone());
        self.seed_task(task);
        Ok(process_id)
    }

    async fn tasks_for_assignee(&self, assignee: &UserId) -> Result<Vec<ExternalTask>, CaseflowError> {
        let mut tasks: Vec<ExternalTask> = self
            .tasks
            .read()
            .values()
            .filter(|t| t.assignee.as_ref() == Some(assignee))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn tasks_for_group(&self, group: &str) -> Result<Vec<ExternalTask>, CaseflowError> {
        let mut tasks: Vec<ExternalTask> = self
            .tasks
            .read()
            .values()
            .filter(|t| t.assignee.is_none() && t.candidate_groups.iter().any(|g| g == group))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn tasks_for_process(&self, process_instance_id: &str) -> Result<Vec<ExternalTask>, CaseflowError> {
        let mut tasks: Vec<ExternalTask> = self
            .tasks
            .read()
            .values()
            .filter(|t| t.process_instance_id == process_instance_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn find_task(&self, id: &ExternalTaskId) -> Result<Option<ExternalTask>, CaseflowError> {
        Ok(self.tasks.read().get(id).cloned())
    }

    async fn set_assignee(&self, id: &ExternalTaskId, assignee: Option<&UserId>) -> Result<(), CaseflowError> {
        let mut tasks = self.tasks.write();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| CaseflowError::not_found(EntityKind::ExternalTask, id))?;
        task.assignee = assignee.cloned();
        Ok(())
    }

    async fn complete_task(&self, id: &ExternalTaskId, variables: Map<String, Value>) -> Result<(), CaseflowError> {
        let task = self
            .tasks
            .write()
            .remove(id)
            .ok_or_else(|| CaseflowError::not_found(EntityKind::ExternalTask, id))?;
        self.completed.write().push(CompletedExternalTask { task, variables });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(case_id: CaseId) -> ProcessStartRequest {
        let mut variables = Map::new();
        variables.insert("caseId".into(), Value::String(case_id.to_string()));
        ProcessStartRequest {
            process_definition_key: "caseInvestigationProcess".into(),
            business_key: "CASE-2026-0001".into(),
            variables,
        }
    }

    #[tokio::test]
    async fn test_start_opens_pooled_task() {
        let runtime = InMemoryWorkflowRuntime::new("Investigations");
        let case_id = CaseId::new();
        let process = runtime.start_case_process(&request(case_id)).await.unwrap();

        let pooled = runtime.tasks_for_group("Investigations").await.unwrap();
        assert_eq!(pooled.len(), 1);
        assert_eq!(pooled[0].process_instance_id, process);
        assert_eq!(pooled[0].case_id, Some(case_id));
    }

    #[tokio::test]
    async fn test_completed_task_disappears() {
        let runtime = InMemoryWorkflowRuntime::new("Investigations");
        runtime.start_case_process(&request(CaseId::new())).await.unwrap();
        let task = runtime.tasks_for_group("Investigations").await.unwrap().remove(0);
        let analyst = UserId::parse("analyst1").unwrap();

        runtime.set_assignee(&task.id, Some(&analyst)).await.unwrap();
        assert!(runtime.tasks_for_group("Investigations").await.unwrap().is_empty());
        assert_eq!(runtime.tasks_for_assignee(&analyst).await.unwrap().len(), 1);

        runtime.complete_task(&task.id, Map::new()).await.unwrap();
        assert!(runtime.find_task(&task.id).await.unwrap().is_none());
        assert_eq!(runtime.completed_tasks().len(), 1);

        let err = runtime.complete_task(&task.id, Map::new()).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
