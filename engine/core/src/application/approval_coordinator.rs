// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Approval Coordinator
//!
//! Sequences the approve/reject decision across the approval task, the case,
//! the follow-on investigation task and the audit log.
//!
//! # Protocol
//!
//! ```text
//! authorize APPROVE_CASE
//!   -> load case + task
//!   -> case must be PENDING_CASE_CREATION_APPROVAL
//!   -> comments must be non-blank
//!   -> not the assignee and no claim confirmation? return ClaimRequired
//!   -> claim (CAS) -> complete task (CAS) -> case transition (CAS)
//!   -> approved: open INVESTIGATE_CASE task, start external process
//!   -> one CASE_APPROVED / CASE_REJECTED audit entry
//! ```
//!
//! There is no transaction spanning these writes. Every write is a
//! compare-and-swap, so two concurrent decisions on the same case cannot
//! both commit. A decision that failed half-way can be retried by the same
//! actor: an approval task already completed by that actor with the same
//! outcome is not completed again.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::audit_log::AuditLogService;
use crate::application::WorkflowSettings;
use crate::domain::audit::{AuditAction, AuditLogEntry};
use crate::domain::case::{Case, CaseId, CaseStatus};
use crate::domain::error::{CaseflowError, CaseflowResult, EntityKind};
use crate::domain::events::{CaseEvent, DecisionEvent, TaskEvent};
use crate::domain::permission::{require, Action};
use crate::domain::repository::{CaseRepository, TaskRepository};
use crate::domain::task::{ClaimEffect, Task, TaskId, TaskKind, TaskOutcome, TaskStatus};
use crate::domain::user::{Actor, UserId};
use crate::domain::workflow_runtime::{ProcessStartRequest, TaskOrigin, WorkflowRuntime};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub task_id: TaskId,
    pub case_id: CaseId,
    pub approved: bool,
    #[serde(default)]
    pub comments: String,
    /// The actor has confirmed taking over the task from its current holder
    #[serde(default)]
    pub claim_confirmed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionReceipt {
    pub case: Case,
    pub task: Task,
    pub audit_entry: AuditLogEntry,
    pub follow_on_task: Option<Task>,
    pub external_process_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Decided(DecisionReceipt),
    /// Nothing was written; retry with `claim_confirmed` set
    #[serde(rename_all = "camelCase")]
    ClaimRequired {
        task_id: TaskId,
        current_assignee: Option<UserId>,
    },
}

#[async_trait]
pub trait ApprovalCoordinator: Send + Sync {
    async fn decide(&self, request: DecisionRequest, actor: &Actor) -> CaseflowResult<DecisionOutcome>;
}

pub struct StandardApprovalCoordinator {
    cases: Arc<dyn CaseRepository>,
    tasks: Arc<dyn TaskRepository>,
    runtime: Option<Arc<dyn WorkflowRuntime>>,
    audit: AuditLogService,
    event_bus: Arc<EventBus>,
    settings: WorkflowSettings,
}

impl StandardApprovalCoordinator {
    pub fn new(
        cases: Arc<dyn CaseRepository>,
        tasks: Arc<dyn TaskRepository>,
        runtime: Option<Arc<dyn WorkflowRuntime>>,
        audit: AuditLogService,
        event_bus: Arc<EventBus>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            cases,
            tasks,
            runtime,
            audit,
            event_bus,
            settings,
        }
    }

    async fn load(&self, request: &DecisionRequest) -> CaseflowResult<(Case, Task)> {
        let case = self
            .cases
            .find_by_id(request.case_id)
            .await?
            .ok_or_else(|| CaseflowError::not_found(EntityKind::Case, request.case_id))?;
        let task = self
            .tasks
            .find_by_id(request.task_id)
            .await?
            .ok_or_else(|| CaseflowError::not_found(EntityKind::Task, request.task_id))?;

        if task.case_id != case.id {
            return Err(CaseflowError::validation(format!(
                "task {} does not belong to case {}",
                task.id, case.case_number
            )));
        }
        if task.kind != TaskKind::ApproveCaseCreation {
            return Err(CaseflowError::validation(format!(
                "task {} is not an approval task",
                task.id
            )));
        }
        Ok((case, task))
    }

    /// Claim (when needed) and complete the approval task. Returns the task
    /// unchanged when it was already completed by this actor with the same
    /// outcome.
    async fn settle_task(
        &self,
        mut task: Task,
        outcome: TaskOutcome,
        comments: &str,
        actor: &Actor,
    ) -> CaseflowResult<Task> {
        if task.status == TaskStatus::Completed {
            return match &task.completion {
                Some(done) if done.completed_by == actor.id && done.outcome == outcome => {
                    info!(task_id = %task.id, actor = %actor.id, "Approval task already settled, resuming decision");
                    Ok(task)
                }
                _ => Err(CaseflowError::conflict(
                    EntityKind::Task,
                    task.id,
                    TaskStatus::Open,
                    task.status,
                    "approval task was already decided",
                )),
            };
        }

        if task.claim(&actor.id)? == ClaimEffect::Claimed {
            task = self.tasks.update(&task).await?;
            self.event_bus.publish_task_event(TaskEvent::TaskClaimed {
                task_id: task.id.to_string(),
                origin: TaskOrigin::RegistryNative,
                case_id: Some(task.case_id),
                claimed_by: actor.id.clone(),
                claimed_at: Utc::now(),
            });
        }

        task.complete(&actor.id, outcome, Some(comments.to_string()))?;
        let task = self.tasks.update(&task).await?;
        self.event_bus.publish_task_event(TaskEvent::TaskCompleted {
            task_id: task.id.to_string(),
            origin: TaskOrigin::RegistryNative,
            case_id: Some(task.case_id),
            outcome: Some(outcome),
            completed_by: actor.id.clone(),
            completed_at: Utc::now(),
        });
        Ok(task)
    }

    async fn open_investigation(&self, case: &Case, actor: &Actor) -> CaseflowResult<Task> {
        let task = Task::investigation_for(case, &self.settings.investigation_group, actor.id.clone())?;
        self.tasks.insert(&task).await?;
        self.event_bus.publish_task_event(TaskEvent::TaskCreated {
            task_id: task.id,
            case_id: case.id,
            kind: task.kind,
            candidate_group: task.candidate_group.clone(),
            assignee: None,
            created_at: task.created_at,
        });
        info!(
            case_id = %case.id,
            task_id = %task.id,
            group = %self.settings.investigation_group,
            "Investigation task opened"
        );
        Ok(task)
    }

    /// Start the external process and record its reference on the case.
    /// Failures are logged and leave the case as it is.
    async fn start_external_process(&self, case: Case) -> Case {
        let Some(runtime) = &self.runtime else {
            return case;
        };
        let request = ProcessStartRequest::for_case(&case, &self.settings.process_definition_key);
        let reference = match runtime.start_case_process(&request).await {
            Ok(reference) => reference,
            Err(e) => {
                warn!(case_id = %case.id, error = %e, "Failed to start external process");
                return case;
            }
        };

        let mut updated = case.clone();
        if let Err(e) = updated.attach_process_reference(reference.clone()) {
            warn!(case_id = %case.id, error = %e, "Cannot record external process reference");
            return case;
        }
        match self.cases.update(&updated).await {
            Ok(stored) => {
                info!(case_id = %stored.id, process_instance_id = %reference, "External process started");
                stored
            }
            Err(e) => {
                warn!(case_id = %case.id, error = %e, "Failed to store external process reference");
                case
            }
        }
    }
}

#[async_trait]
impl ApprovalCoordinator for StandardApprovalCoordinator {
    async fn decide(&self, request: DecisionRequest, actor: &Actor) -> CaseflowResult<DecisionOutcome> {
        require(actor, Action::ApproveCase)?;

        let (mut case, task) = self.load(&request).await?;
        if case.status != CaseStatus::PendingCaseCreationApproval {
            return Err(CaseflowError::conflict(
                EntityKind::Case,
                case.id,
                CaseStatus::PendingCaseCreationApproval,
                case.status,
                "case is not pending approval",
            ));
        }
        let comments = request.comments.trim();
        if comments.is_empty() {
            return Err(CaseflowError::validation("comments are required for a decision"));
        }

        let settled = task.status == TaskStatus::Completed;
        if !settled && !task.is_assigned_to(&actor.id) && !request.claim_confirmed {
            info!(task_id = %task.id, actor = %actor.id, "Decision needs claim confirmation");
            return Ok(DecisionOutcome::ClaimRequired {
                task_id: task.id,
                current_assignee: task.assignee.clone(),
            });
        }

        let outcome = if request.approved {
            TaskOutcome::ApproveCaseCreation
        } else {
            TaskOutcome::RejectCaseCreation
        };
        let task = self.settle_task(task, outcome, comments, actor).await?;

        let from = case.status;
        if request.approved {
            case.approve()?;
        } else {
            case.reject()?;
        }
        let case = self.cases.update(&case).await?;

        let (case, follow_on_task) = if request.approved {
            let follow_on = self.open_investigation(&case, actor).await?;
            (self.start_external_process(case).await, Some(follow_on))
        } else {
            (case, None)
        };

        let action = if request.approved {
            AuditAction::CaseApproved
        } else {
            AuditAction::CaseRejected
        };
        let audit_entry = self
            .audit
            .record(
                AuditLogEntry::new(
                    case.id,
                    action,
                    actor.id.clone(),
                    format!("{}: {}", if request.approved { "Approved" } else { "Rejected" }, comments),
                )
                .with_status_change(from, case.status),
            )
            .await?;

        self.event_bus.publish_case_event(CaseEvent::CaseStatusChanged {
            case_id: case.id,
            from,
            to: case.status,
            changed_by: actor.id.clone(),
            changed_at: case.updated_at,
        });
        self.event_bus.publish_decision_event(DecisionEvent::DecisionRecorded {
            case_id: case.id,
            task_id: task.id,
            approved: request.approved,
            decided_by: actor.id.clone(),
            follow_on_task_id: follow_on_task.as_ref().map(|t| t.id),
            decided_at: audit_entry.timestamp,
        });
        metrics::counter!(
            "caseflow_decisions_total",
            "outcome" => if request.approved { "approved" } else { "rejected" }
        )
        .increment(1);
        metrics::counter!("caseflow_case_transitions_total", "to" => case.status.as_str()).increment(1);
        info!(
            case_id = %case.id,
            case_number = %case.case_number,
            task_id = %task.id,
            approved = request.approved,
            actor = %actor.id,
            "Case decision recorded"
        );

        Ok(DecisionOutcome::Decided(DecisionReceipt {
            external_process_ref: case.external_process_ref.clone(),
            case,
            task,
            audit_entry,
            follow_on_task,
        }))
    }
}
