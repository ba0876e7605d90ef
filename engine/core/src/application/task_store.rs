// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Task Store
//!
//! Create, assign, claim and complete tasks of either origin. Registry-native
//! tasks live in the [`TaskRepository`]; external workflow tasks are reached
//! through the optional [`WorkflowRuntime`] adapter.
//!
//! A task reference that parses as a UUID and exists natively is native.
//! Anything else is routed to the runtime.
//!
//! Approval tasks are never completed here; the approval coordinator owns
//! that path.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::audit_log::AuditLogService;
use crate::application::case_registry::CaseRegistry;
use crate::application::user_directory::UserDirectory;
use crate::domain::audit::{AuditAction, AuditLogEntry};
use crate::domain::case::{CaseId, Priority};
use crate::domain::error::{CaseflowError, CaseflowResult, EntityKind};
use crate::domain::events::TaskEvent;
use crate::domain::permission::{authorize, require, Action};
use crate::domain::repository::{CaseRepository, RepositoryError, TaskRepository};
use crate::domain::task::{ClaimEffect, CompletionEffect, NewTask, Task, TaskId, TaskKind, TaskOutcome};
use crate::domain::user::{Actor, UserId};
use crate::domain::workflow_runtime::{ExternalTask, ExternalTaskId, WorkItem, WorkflowRuntime};
use crate::infrastructure::event_bus::EventBus;

const MIRROR_ATTEMPTS: u32 = 3;

/// Body of `POST /api/tasks/create/{caseId}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default = "default_kind")]
    pub kind: TaskKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<UserId>,
    #[serde(default)]
    pub candidate_group: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

fn default_kind() -> TaskKind {
    TaskKind::General
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, task_ref: &str, actor: &Actor) -> CaseflowResult<WorkItem>;

    async fn create(&self, case_id: CaseId, request: CreateTaskRequest, actor: &Actor) -> CaseflowResult<Task>;

    /// Set or clear the assignee. `None` or a blank id returns the task to
    /// its candidate group.
    async fn assign(&self, task_ref: &str, assignee: Option<&str>, actor: &Actor) -> CaseflowResult<WorkItem>;

    async fn claim(&self, task_ref: &str, actor: &Actor) -> CaseflowResult<WorkItem>;

    /// Complete a task held by the actor. Completing a registry-native task
    /// that is already COMPLETED succeeds without writing anything.
    async fn complete(
        &self,
        task_ref: &str,
        actor: &Actor,
        comments: Option<String>,
        variables: Map<String, Value>,
    ) -> CaseflowResult<WorkItem>;

    async fn by_assignee(&self, user: &UserId, actor: &Actor) -> CaseflowResult<Vec<WorkItem>>;

    async fn by_group(&self, group: &str, actor: &Actor) -> CaseflowResult<Vec<WorkItem>>;

    async fn by_case(&self, case_id: CaseId, actor: &Actor) -> CaseflowResult<Vec<WorkItem>>;
}

enum ResolvedTask {
    Native(Task),
    External(ExternalTask),
}

pub struct StandardTaskStore {
    tasks: Arc<dyn TaskRepository>,
    cases: Arc<dyn CaseRepository>,
    registry: Arc<dyn CaseRegistry>,
    runtime: Option<Arc<dyn WorkflowRuntime>>,
    users: UserDirectory,
    audit: AuditLogService,
    event_bus: Arc<EventBus>,
}

impl StandardTaskStore {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        cases: Arc<dyn CaseRepository>,
        registry: Arc<dyn CaseRegistry>,
        runtime: Option<Arc<dyn WorkflowRuntime>>,
        users: UserDirectory,
        audit: AuditLogService,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            tasks,
            cases,
            registry,
            runtime,
            users,
            audit,
            event_bus,
        }
    }

    async fn resolve(&self, task_ref: &str) -> CaseflowResult<ResolvedTask> {
        let task_ref = task_ref.trim();
        if let Ok(id) = TaskId::from_string(task_ref) {
            if let Some(task) = self.tasks.find_by_id(id).await? {
                return Ok(ResolvedTask::Native(task));
            }
        }

        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| CaseflowError::not_found(EntityKind::Task, task_ref))?;
        let id = ExternalTaskId(task_ref.to_string());
        runtime
            .find_task(&id)
            .await?
            .map(ResolvedTask::External)
            .ok_or_else(|| CaseflowError::not_found(EntityKind::Task, task_ref))
    }

    fn runtime(&self) -> CaseflowResult<&Arc<dyn WorkflowRuntime>> {
        self.runtime
            .as_ref()
            .ok_or_else(|| CaseflowError::Network("no external workflow runtime configured".to_string()))
    }

    /// Audit entries are keyed by case; external tasks without a case id
    /// leave no audit trail.
    async fn audit_task(
        &self,
        case_id: Option<CaseId>,
        action: AuditAction,
        actor: &Actor,
        details: String,
    ) -> CaseflowResult<()> {
        match case_id {
            Some(case_id) => {
                self.audit
                    .record(AuditLogEntry::new(case_id, action, actor.id.clone(), details))
                    .await?;
            }
            None => debug!(action = %action, "Skipping audit entry for task without a case"),
        }
        Ok(())
    }

    /// Keep `case.assignee` in step with its investigation task. A concurrent
    /// case write is re-read and reapplied; the task change itself stands.
    async fn mirror_case_assignee(&self, task: &Task) {
        if task.kind != TaskKind::InvestigateCase {
            return;
        }
        for attempt in 1..=MIRROR_ATTEMPTS {
            let result = match self.cases.find_by_id(task.case_id).await {
                Ok(Some(mut case)) if case.assignee != task.assignee => {
                    case.set_assignee(task.assignee.clone());
                    self.cases.update(&case).await.map(|_| ())
                }
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => return,
                Err(RepositoryError::VersionConflict { .. }) if attempt < MIRROR_ATTEMPTS => {
                    debug!(case_id = %task.case_id, attempt, "Case changed underneath assignee mirror, retrying");
                }
                Err(e) => {
                    metrics::counter!("caseflow_case_assignee_mirror_failures_total").increment(1);
                    warn!(case_id = %task.case_id, task_id = %task.id, error = %e, "Failed to mirror case assignee");
                    return;
                }
            }
        }
    }

    fn sorted(mut items: Vec<WorkItem>) -> Vec<WorkItem> {
        items.sort_by_key(|item| item.created_at());
        items
    }
}

fn count(op: &'static str) {
    metrics::counter!("caseflow_task_operations_total", "op" => op).increment(1);
}

#[async_trait]
impl TaskStore for StandardTaskStore {
    async fn get(&self, task_ref: &str, actor: &Actor) -> CaseflowResult<WorkItem> {
        match self.resolve(task_ref).await? {
            ResolvedTask::Native(task) => {
                let pooled = task.assignee.is_none();
                if !pooled && !task.is_assigned_to(&actor.id) && !authorize(actor.role, Action::ViewAllCases) {
                    self.registry.get(task.case_id, actor).await?;
                }
                Ok(WorkItem::RegistryNative(task))
            }
            ResolvedTask::External(task) => Ok(WorkItem::ExternalWorkflow(task)),
        }
    }

    async fn create(&self, case_id: CaseId, request: CreateTaskRequest, actor: &Actor) -> CaseflowResult<Task> {
        require(actor, Action::AssignTask)?;
        if request.kind == TaskKind::ApproveCaseCreation {
            return Err(CaseflowError::validation(
                "approval tasks are opened automatically and cannot be created by hand",
            ));
        }
        let case = self
            .cases
            .find_by_id(case_id)
            .await?
            .ok_or_else(|| CaseflowError::not_found(EntityKind::Case, case_id))?;
        if case.status.is_terminal() {
            return Err(CaseflowError::conflict(
                EntityKind::Case,
                case.id,
                "an active case",
                case.status,
                "tasks cannot be added to a closed case",
            ));
        }
        if let Some(assignee) = &request.assignee {
            self.users.ensure_exists(assignee).await?;
        }

        let task = Task::open(NewTask {
            case_id: case.id,
            kind: request.kind,
            title: request.title,
            description: request.description,
            assignee: request.assignee,
            candidate_group: request.candidate_group,
            priority: request.priority.or(case.priority).unwrap_or_default(),
            created_by: actor.id.clone(),
        })?;
        self.tasks.insert(&task).await?;

        self.audit
            .record(AuditLogEntry::new(
                case.id,
                AuditAction::TaskCreated,
                actor.id.clone(),
                format!("Task created: {}", task.title),
            ))
            .await?;
        self.event_bus.publish_task_event(TaskEvent::TaskCreated {
            task_id: task.id,
            case_id: case.id,
            kind: task.kind,
            candidate_group: task.candidate_group.clone(),
            assignee: task.assignee.clone(),
            created_at: task.created_at,
        });
        count("create");
        info!(task_id = %task.id, case_id = %case.id, actor = %actor.id, "Task created");
        Ok(task)
    }

    async fn assign(&self, task_ref: &str, assignee: Option<&str>, actor: &Actor) -> CaseflowResult<WorkItem> {
        require(actor, Action::AssignTask)?;
        let assignee = match assignee.map(str::trim).filter(|a| !a.is_empty()) {
            Some(raw) => {
                let id = UserId::parse(raw)?;
                self.users.ensure_exists(&id).await?;
                Some(id)
            }
            None => None,
        };
        let (action, details) = match &assignee {
            Some(user) => (AuditAction::TaskAssigned, format!("Task assigned to {}", user)),
            None => (AuditAction::TaskUnassigned, "Task returned to its candidate group".to_string()),
        };

        let item = match self.resolve(task_ref).await? {
            ResolvedTask::Native(mut task) => {
                task.assign(assignee.clone())?;
                let task = self.tasks.update(&task).await?;
                self.mirror_case_assignee(&task).await;
                WorkItem::RegistryNative(task)
            }
            ResolvedTask::External(mut task) => {
                self.runtime()?.set_assignee(&task.id, assignee.as_ref()).await?;
                task.assignee = assignee.clone();
                WorkItem::ExternalWorkflow(task)
            }
        };

        self.audit_task(item.case_id(), action, actor, details).await?;
        self.event_bus.publish_task_event(TaskEvent::TaskAssigned {
            task_id: item.id(),
            origin: item.origin(),
            case_id: item.case_id(),
            assignee: assignee.clone(),
            performed_by: actor.id.clone(),
            assigned_at: Utc::now(),
        });
        count(if assignee.is_some() { "assign" } else { "unassign" });
        info!(
            task_id = %item.id(),
            assignee = assignee.as_ref().map(|a| a.as_str()).unwrap_or("-"),
            actor = %actor.id,
            "Task assignment changed"
        );
        Ok(item)
    }

    async fn claim(&self, task_ref: &str, actor: &Actor) -> CaseflowResult<WorkItem> {
        let item = match self.resolve(task_ref).await? {
            ResolvedTask::Native(mut task) => {
                if task.kind == TaskKind::ApproveCaseCreation {
                    require(actor, Action::ApproveCase)?;
                }
                match task.claim(&actor.id)? {
                    ClaimEffect::AlreadyHeld => return Ok(WorkItem::RegistryNative(task)),
                    ClaimEffect::Claimed => {}
                }
                let task = self.tasks.update(&task).await?;
                self.mirror_case_assignee(&task).await;
                WorkItem::RegistryNative(task)
            }
            ResolvedTask::External(mut task) => {
                match &task.assignee {
                    Some(current) if current == &actor.id => return Ok(WorkItem::ExternalWorkflow(task)),
                    Some(current) => {
                        return Err(CaseflowError::conflict(
                            EntityKind::ExternalTask,
                            &task.id,
                            format!("unassigned or assigned to {}", actor.id),
                            format!("assigned to {}", current),
                            "task is held by another user",
                        ))
                    }
                    None => {}
                }
                self.runtime()?.set_assignee(&task.id, Some(&actor.id)).await?;
                task.assignee = Some(actor.id.clone());
                WorkItem::ExternalWorkflow(task)
            }
        };

        self.audit_task(
            item.case_id(),
            AuditAction::TaskClaimed,
            actor,
            format!("Task claimed by {}", actor.id),
        )
        .await?;
        self.event_bus.publish_task_event(TaskEvent::TaskClaimed {
            task_id: item.id(),
            origin: item.origin(),
            case_id: item.case_id(),
            claimed_by: actor.id.clone(),
            claimed_at: Utc::now(),
        });
        count("claim");
        info!(task_id = %item.id(), actor = %actor.id, "Task claimed");
        Ok(item)
    }

    async fn complete(
        &self,
        task_ref: &str,
        actor: &Actor,
        comments: Option<String>,
        mut variables: Map<String, Value>,
    ) -> CaseflowResult<WorkItem> {
        require(actor, Action::CompleteTask)?;
        let comments = comments.filter(|c| !c.trim().is_empty());

        let (item, outcome) = match self.resolve(task_ref).await? {
            ResolvedTask::Native(mut task) => {
                if task.kind == TaskKind::ApproveCaseCreation {
                    return Err(CaseflowError::conflict(
                        EntityKind::Task,
                        task.id,
                        "a non-approval task",
                        task.kind.as_str(),
                        "approval tasks are completed through the approve-case decision",
                    ));
                }
                match task.complete(&actor.id, TaskOutcome::Done, comments.clone())? {
                    CompletionEffect::AlreadyCompleted => {
                        debug!(task_id = %task.id, "Task already completed");
                        return Ok(WorkItem::RegistryNative(task));
                    }
                    CompletionEffect::Completed => {}
                }
                let task = self.tasks.update(&task).await?;
                (WorkItem::RegistryNative(task), Some(TaskOutcome::Done))
            }
            ResolvedTask::External(task) => {
                if task.assignee.as_ref() != Some(&actor.id) {
                    return Err(CaseflowError::conflict(
                        EntityKind::ExternalTask,
                        &task.id,
                        format!("assigned to {}", actor.id),
                        task.assignee
                            .as_ref()
                            .map(|a| format!("assigned to {}", a))
                            .unwrap_or_else(|| "unassigned".to_string()),
                        "claim the task before completing it",
                    ));
                }
                if let Some(comments) = &comments {
                    variables.insert("comments".to_string(), Value::String(comments.clone()));
                }
                self.runtime()?.complete_task(&task.id, variables).await?;
                (WorkItem::ExternalWorkflow(task), None)
            }
        };

        self.audit_task(
            item.case_id(),
            AuditAction::TaskCompleted,
            actor,
            match &comments {
                Some(c) => format!("Task completed: {}", c),
                None => "Task completed".to_string(),
            },
        )
        .await?;
        self.event_bus.publish_task_event(TaskEvent::TaskCompleted {
            task_id: item.id(),
            origin: item.origin(),
            case_id: item.case_id(),
            outcome,
            completed_by: actor.id.clone(),
            completed_at: Utc::now(),
        });
        count("complete");
        info!(task_id = %item.id(), actor = %actor.id, "Task completed");
        Ok(item)
    }

    async fn by_assignee(&self, user: &UserId, actor: &Actor) -> CaseflowResult<Vec<WorkItem>> {
        if user != &actor.id {
            require(actor, Action::ViewAllCases)?;
        }
        let mut items: Vec<WorkItem> = self
            .tasks
            .find_by_assignee(user)
            .await?
            .into_iter()
            .map(WorkItem::RegistryNative)
            .collect();
        if let Some(runtime) = &self.runtime {
            items.extend(
                runtime
                    .tasks_for_assignee(user)
                    .await?
                    .into_iter()
                    .map(WorkItem::ExternalWorkflow),
            );
        }
        Ok(Self::sorted(items))
    }

    async fn by_group(&self, group: &str, _actor: &Actor) -> CaseflowResult<Vec<WorkItem>> {
        let group = group.trim();
        if group.is_empty() {
            return Err(CaseflowError::validation("group must not be blank"));
        }
        let mut items: Vec<WorkItem> = self
            .tasks
            .find_by_group(group)
            .await?
            .into_iter()
            .map(WorkItem::RegistryNative)
            .collect();
        if let Some(runtime) = &self.runtime {
            items.extend(
                runtime
                    .tasks_for_group(group)
                    .await?
                    .into_iter()
                    .map(WorkItem::ExternalWorkflow),
            );
        }
        Ok(Self::sorted(items))
    }

    async fn by_case(&self, case_id: CaseId, actor: &Actor) -> CaseflowResult<Vec<WorkItem>> {
        let case = self.registry.get(case_id, actor).await?;
        let mut items: Vec<WorkItem> = self
            .tasks
            .find_by_case(case.id)
            .await?
            .into_iter()
            .map(WorkItem::RegistryNative)
            .collect();
        if let (Some(runtime), Some(process)) = (&self.runtime, &case.external_process_ref) {
            items.extend(
                runtime
                    .tasks_for_process(process)
                    .await?
                    .into_iter()
                    .map(WorkItem::ExternalWorkflow),
            );
        }
        Ok(Self::sorted(items))
    }
}
