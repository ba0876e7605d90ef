// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Case Registry Use Case
//!
//! Application service owning case records and driving every actor-initiated
//! case transition.
//!
//! # Flow (create / complete)
//!
//! 1. Authorize CREATE_CASE
//! 2. Build or mutate the `Case` aggregate (all validation lives there)
//! 3. Persist (compare-and-swap on update)
//! 4. Append the audit entry and publish a `CaseEvent`
//! 5. If the case entered PENDING_CASE_CREATION_APPROVAL, open its single
//!    approval task
//!
//! Approval and rejection are not exposed here; see
//! [`crate::application::approval_coordinator`].
//!
//! # Visibility
//!
//! Actors holding VIEW_ALL_CASES see every case. Everyone else sees the
//! cases they created and cases on which they hold a task.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::audit_log::AuditLogService;
use crate::application::WorkflowSettings;
use crate::domain::audit::{AuditAction, AuditLogEntry};
use crate::domain::case::{Case, CaseFields, CaseFilter, CaseId, CaseStatus};
use crate::domain::error::{CaseflowError, CaseflowResult, EntityKind};
use crate::domain::events::{CaseEvent, TaskEvent};
use crate::domain::permission::{authorize, require, Action};
use crate::domain::repository::{CaseRepository, TaskRepository};
use crate::domain::task::{Task, TaskKind};
use crate::domain::user::Actor;
use crate::infrastructure::event_bus::EventBus;

#[async_trait]
pub trait CaseRegistry: Send + Sync {
    /// Open a new case. Lands in PENDING_CASE_CREATION_APPROVAL when fully
    /// classified, DRAFT otherwise.
    async fn create(&self, fields: CaseFields, actor: &Actor) -> CaseflowResult<Case>;

    /// Fill in a DRAFT case and submit it for approval
    async fn complete(&self, case_id: CaseId, fields: CaseFields, actor: &Actor) -> CaseflowResult<Case>;

    /// Update a DRAFT case without submitting it
    async fn edit(&self, case_id: CaseId, fields: CaseFields, actor: &Actor) -> CaseflowResult<Case>;

    async fn abandon(&self, case_id: CaseId, actor: &Actor, reason: &str) -> CaseflowResult<Case>;

    async fn get(&self, case_id: CaseId, actor: &Actor) -> CaseflowResult<Case>;

    async fn find_by_number(&self, case_number: &str, actor: &Actor) -> CaseflowResult<Case>;

    async fn list(&self, filter: CaseFilter, actor: &Actor) -> CaseflowResult<Vec<Case>>;

    /// Remove a DRAFT or ABANDONED case that has no tasks
    async fn delete(&self, case_id: CaseId, actor: &Actor) -> CaseflowResult<()>;
}

pub struct StandardCaseRegistry {
    cases: Arc<dyn CaseRepository>,
    tasks: Arc<dyn TaskRepository>,
    audit: AuditLogService,
    event_bus: Arc<EventBus>,
    settings: WorkflowSettings,
}

impl StandardCaseRegistry {
    pub fn new(
        cases: Arc<dyn CaseRepository>,
        tasks: Arc<dyn TaskRepository>,
        audit: AuditLogService,
        event_bus: Arc<EventBus>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            cases,
            tasks,
            audit,
            event_bus,
            settings,
        }
    }

    async fn load(&self, case_id: CaseId) -> CaseflowResult<Case> {
        self.cases
            .find_by_id(case_id)
            .await?
            .ok_or_else(|| CaseflowError::not_found(EntityKind::Case, case_id))
    }

    async fn allocate_case_number(&self) -> CaseflowResult<String> {
        let year = Utc::now().year();
        let sequence = self.cases.next_case_sequence(year).await?;
        Ok(format!("{}-{}-{:04}", self.settings.case_number_prefix, year, sequence))
    }

    async fn holds_task_on(&self, case_id: CaseId, actor: &Actor) -> CaseflowResult<bool> {
        let tasks = self.tasks.find_by_case(case_id).await?;
        Ok(tasks.iter().any(|t| t.is_assigned_to(&actor.id)))
    }

    async fn ensure_visible(&self, case: &Case, actor: &Actor) -> CaseflowResult<()> {
        if case.created_by == actor.id
            || authorize(actor.role, Action::ViewAllCases)
            || self.holds_task_on(case.id, actor).await?
        {
            return Ok(());
        }
        Err(CaseflowError::permission(
            &actor.id,
            format!("case {} is not visible to this user", case.case_number),
        ))
    }

    /// Creator, or a holder of VIEW_ALL_CASES
    fn ensure_owner_or_overseer(&self, case: &Case, actor: &Actor, verb: &str) -> CaseflowResult<()> {
        if case.created_by == actor.id || authorize(actor.role, Action::ViewAllCases) {
            return Ok(());
        }
        Err(CaseflowError::permission(
            &actor.id,
            format!("only the creator may {} case {}", verb, case.case_number),
        ))
    }

    async fn record_transition(
        &self,
        case: &Case,
        from: CaseStatus,
        action: AuditAction,
        actor: &Actor,
        details: String,
    ) -> CaseflowResult<()> {
        self.audit
            .record(AuditLogEntry::new(case.id, action, actor.id.clone(), details).with_status_change(from, case.status))
            .await?;
        self.event_bus.publish_case_event(CaseEvent::CaseStatusChanged {
            case_id: case.id,
            from,
            to: case.status,
            changed_by: actor.id.clone(),
            changed_at: case.updated_at,
        });
        metrics::counter!("caseflow_case_transitions_total", "to" => case.status.as_str()).increment(1);
        info!(
            case_id = %case.id,
            case_number = %case.case_number,
            from = %from,
            to = %case.status,
            actor = %actor.id,
            "Case status changed"
        );
        Ok(())
    }

    /// Open the approval task for a pending case. Returns the existing one
    /// if the case already has an open approval task.
    async fn open_approval_task(&self, case: &Case, actor: &Actor) -> CaseflowResult<Task> {
        if let Some(existing) = self
            .tasks
            .find_open_by_case_and_kind(case.id, TaskKind::ApproveCaseCreation)
            .await?
        {
            debug!(case_id = %case.id, task_id = %existing.id, "Approval task already open");
            return Ok(existing);
        }

        let task = Task::approval_for(case, &self.settings.approval_group)?;
        self.tasks.insert(&task).await?;
        self.audit
            .record(AuditLogEntry::new(
                case.id,
                AuditAction::TaskCreated,
                actor.id.clone(),
                format!("Approval task created for group {}", self.settings.approval_group),
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
        metrics::counter!("caseflow_task_operations_total", "op" => "create").increment(1);
        info!(case_id = %case.id, task_id = %task.id, group = %self.settings.approval_group, "Approval task opened");
        Ok(task)
    }
}

#[async_trait]
impl CaseRegistry for StandardCaseRegistry {
    async fn create(&self, fields: CaseFields, actor: &Actor) -> CaseflowResult<Case> {
        require(actor, Action::CreateCase)?;
        fields.validate()?;

        let case_number = self.allocate_case_number().await?;
        let case = Case::open(case_number, fields, actor.id.clone())?;
        self.cases.insert(&case).await?;

        let mut entry = AuditLogEntry::new(
            case.id,
            AuditAction::CaseCreated,
            actor.id.clone(),
            format!("Case {} created", case.case_number),
        );
        entry.new_value = Some(case.status.as_str().to_string());
        self.audit.record(entry).await?;

        self.event_bus.publish_case_event(CaseEvent::CaseCreated {
            case_id: case.id,
            case_number: case.case_number.clone(),
            status: case.status,
            created_by: actor.id.clone(),
            created_at: case.created_at,
        });
        metrics::counter!("caseflow_case_transitions_total", "to" => case.status.as_str()).increment(1);
        info!(
            case_id = %case.id,
            case_number = %case.case_number,
            status = %case.status,
            actor = %actor.id,
            "Case created"
        );

        if case.status == CaseStatus::PendingCaseCreationApproval {
            self.open_approval_task(&case, actor).await?;
        }
        Ok(case)
    }

    async fn complete(&self, case_id: CaseId, fields: CaseFields, actor: &Actor) -> CaseflowResult<Case> {
        require(actor, Action::CreateCase)?;
        let mut case = self.load(case_id).await?;
        self.ensure_owner_or_overseer(&case, actor, "complete")?;

        let from = case.status;
        case.complete(fields)?;
        let case = self.cases.update(&case).await?;

        self.record_transition(
            &case,
            from,
            AuditAction::CaseCompleted,
            actor,
            format!("Case {} submitted for approval", case.case_number),
        )
        .await?;
        self.open_approval_task(&case, actor).await?;
        Ok(case)
    }

    async fn edit(&self, case_id: CaseId, fields: CaseFields, actor: &Actor) -> CaseflowResult<Case> {
        require(actor, Action::CreateCase)?;
        let mut case = self.load(case_id).await?;
        self.ensure_owner_or_overseer(&case, actor, "edit")?;

        case.edit(fields)?;
        let case = self.cases.update(&case).await?;

        self.audit
            .record(AuditLogEntry::new(
                case.id,
                AuditAction::CaseUpdated,
                actor.id.clone(),
                format!("Case {} updated", case.case_number),
            ))
            .await?;
        self.event_bus.publish_case_event(CaseEvent::CaseUpdated {
            case_id: case.id,
            updated_by: actor.id.clone(),
            updated_at: case.updated_at,
        });
        debug!(case_id = %case.id, actor = %actor.id, "Draft case edited");
        Ok(case)
    }

    async fn abandon(&self, case_id: CaseId, actor: &Actor, reason: &str) -> CaseflowResult<Case> {
        let mut case = self.load(case_id).await?;
        let from = case.status;
        case.abandon(&actor.id, reason)?;
        let case = self.cases.update(&case).await?;

        self.record_transition(
            &case,
            from,
            AuditAction::CaseAbandoned,
            actor,
            format!("Case abandoned: {}", reason.trim()),
        )
        .await?;
        Ok(case)
    }

    async fn get(&self, case_id: CaseId, actor: &Actor) -> CaseflowResult<Case> {
        let case = self.load(case_id).await?;
        self.ensure_visible(&case, actor).await?;
        Ok(case)
    }

    async fn find_by_number(&self, case_number: &str, actor: &Actor) -> CaseflowResult<Case> {
        let case = self
            .cases
            .find_by_number(case_number)
            .await?
            .ok_or_else(|| CaseflowError::not_found(EntityKind::Case, case_number))?;
        self.ensure_visible(&case, actor).await?;
        Ok(case)
    }

    async fn list(&self, filter: CaseFilter, actor: &Actor) -> CaseflowResult<Vec<Case>> {
        let cases = self.cases.list(&filter).await?;
        if authorize(actor.role, Action::ViewAllCases) {
            return Ok(cases);
        }

        let held: HashSet<CaseId> = self
            .tasks
            .find_by_assignee(&actor.id)
            .await?
            .into_iter()
            .map(|t| t.case_id)
            .collect();
        Ok(cases
            .into_iter()
            .filter(|c| c.created_by == actor.id || held.contains(&c.id))
            .collect())
    }

    async fn delete(&self, case_id: CaseId, actor: &Actor) -> CaseflowResult<()> {
        let case = self.load(case_id).await?;
        self.ensure_owner_or_overseer(&case, actor, "delete")?;

        if !matches!(case.status, CaseStatus::Draft | CaseStatus::Abandoned) {
            return Err(CaseflowError::conflict(
                EntityKind::Case,
                case.id,
                "DRAFT or ABANDONED",
                case.status,
                "only draft or abandoned cases can be deleted",
            ));
        }
        let tasks = self.tasks.find_by_case(case.id).await?;
        if !tasks.is_empty() {
            return Err(CaseflowError::conflict(
                EntityKind::Case,
                case.id,
                "no tasks",
                format!("{} task(s)", tasks.len()),
                "cases with tasks cannot be deleted",
            ));
        }

        self.cases.delete(case.id).await?;
        self.audit
            .record(AuditLogEntry::new(
                case.id,
                AuditAction::CaseDeleted,
                actor.id.clone(),
                format!("Case {} deleted", case.case_number),
            ))
            .await?;
        self.event_bus.publish_case_event(CaseEvent::CaseDeleted {
            case_id: case.id,
            deleted_by: actor.id.clone(),
            deleted_at: Utc::now(),
        });
        info!(case_id = %case.id, case_number = %case.case_number, actor = %actor.id, "Case deleted");
        Ok(())
    }
}
