// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::case::{CaseId, CaseStatus};
use crate::domain::task::{TaskId, TaskKind, TaskOutcome};
use crate::domain::user::UserId;
use crate::domain::workflow_runtime::TaskOrigin;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum CaseEvent {
    CaseCreated {
        case_id: CaseId,
        case_number: String,
        status: CaseStatus,
        created_by: UserId,
        created_at: DateTime<Utc>,
    },
    CaseStatusChanged {
        case_id: CaseId,
        from: CaseStatus,
        to: CaseStatus,
        changed_by: UserId,
        changed_at: DateTime<Utc>,
    },
    CaseUpdated {
        case_id: CaseId,
        updated_by: UserId,
        updated_at: DateTime<Utc>,
    },
    CaseDeleted {
        case_id: CaseId,
        deleted_by: UserId,
        deleted_at: DateTime<Utc>,
    },
}

impl CaseEvent {
    pub fn case_id(&self) -> CaseId {
        match self {
            CaseEvent::CaseCreated { case_id, .. }
            | CaseEvent::CaseStatusChanged { case_id, .. }
            | CaseEvent::CaseUpdated { case_id, .. }
            | CaseEvent::CaseDeleted { case_id, .. } => *case_id,
        }
    }
}

/// Task ids are strings here because external workflow tasks share the stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum TaskEvent {
    TaskCreated {
        task_id: TaskId,
        case_id: CaseId,
        kind: TaskKind,
        candidate_group: Option<String>,
        assignee: Option<UserId>,
        created_at: DateTime<Utc>,
    },
    TaskAssigned {
        task_id: String,
        origin: TaskOrigin,
        case_id: Option<CaseId>,
        assignee: Option<UserId>,
        performed_by: UserId,
        assigned_at: DateTime<Utc>,
    },
    TaskClaimed {
        task_id: String,
        origin: TaskOrigin,
        case_id: Option<CaseId>,
        claimed_by: UserId,
        claimed_at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: String,
        origin: TaskOrigin,
        case_id: Option<CaseId>,
        outcome: Option<TaskOutcome>,
        completed_by: UserId,
        completed_at: DateTime<Utc>,
    },
}

impl TaskEvent {
    pub fn case_id(&self) -> Option<CaseId> {
        match self {
            TaskEvent::TaskCreated { case_id, .. } => Some(*case_id),
            TaskEvent::TaskAssigned { case_id, .. }
            | TaskEvent::TaskClaimed { case_id, .. }
            | TaskEvent::TaskCompleted { case_id, .. } => *case_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum DecisionEvent {
    DecisionRecorded {
        case_id: CaseId,
        task_id: TaskId,
        approved: bool,
        decided_by: UserId,
        follow_on_task_id: Option<TaskId>,
        decided_at: DateTime<Utc>,
    },
}

impl DecisionEvent {
    pub fn case_id(&self) -> CaseId {
        match self {
            DecisionEvent::DecisionRecorded { case_id, .. } => *case_id,
        }
    }
}
