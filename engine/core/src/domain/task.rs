// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Task Aggregate (registry-native)
//!
//! A unit of human work tied to a case. Tasks are created OPEN with either an
//! assignee or a candidate group (pooled). Claiming takes ownership without
//! changing status; callers must hold a task before completing it.
//!
//! Completing an already COMPLETED task is a no-op success so that duplicate
//! client retries are harmless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::case::{Case, CaseId, Priority};
use crate::domain::error::{CaseflowError, EntityKind};
use crate::domain::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// `Claimed` is never produced for registry-native tasks (claiming keeps them
/// OPEN); it describes assigned external workflow tasks in merged listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Open,
    Claimed,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "OPEN",
            TaskStatus::Claimed => "CLAIMED",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(TaskStatus::Open),
            "CLAIMED" => Ok(TaskStatus::Claimed),
            "COMPLETED" => Ok(TaskStatus::Completed),
            other => Err(CaseflowError::validation(format!("Invalid task status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    /// Supervisory sign-off on a newly classified case
    ApproveCaseCreation,
    /// Follow-on work once a case is approved
    InvestigateCase,
    General,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ApproveCaseCreation => "APPROVE_CASE_CREATION",
            TaskKind::InvestigateCase => "INVESTIGATE_CASE",
            TaskKind::General => "GENERAL",
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVE_CASE_CREATION" => Ok(TaskKind::ApproveCaseCreation),
            "INVESTIGATE_CASE" => Ok(TaskKind::InvestigateCase),
            "GENERAL" => Ok(TaskKind::General),
            other => Err(CaseflowError::validation(format!("Invalid task kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskOutcome {
    ApproveCaseCreation,
    RejectCaseCreation,
    Done,
}

impl TaskOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOutcome::ApproveCaseCreation => "APPROVE_CASE_CREATION",
            TaskOutcome::RejectCaseCreation => "REJECT_CASE_CREATION",
            TaskOutcome::Done => "DONE",
        }
    }
}

impl std::str::FromStr for TaskOutcome {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVE_CASE_CREATION" => Ok(TaskOutcome::ApproveCaseCreation),
            "REJECT_CASE_CREATION" => Ok(TaskOutcome::RejectCaseCreation),
            "DONE" => Ok(TaskOutcome::Done),
            other => Err(CaseflowError::validation(format!("Invalid task outcome: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletion {
    pub outcome: TaskOutcome,
    pub completed_by: UserId,
    pub completed_at: DateTime<Utc>,
    pub comments: Option<String>,
}

/// Parameters for opening a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub case_id: CaseId,
    pub kind: TaskKind,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<UserId>,
    pub candidate_group: Option<String>,
    pub priority: Priority,
    pub created_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub case_id: CaseId,
    pub kind: TaskKind,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee: Option<UserId>,
    pub candidate_group: Option<String>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    pub completion: Option<TaskCompletion>,
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimEffect {
    Claimed,
    AlreadyHeld,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEffect {
    Completed,
    AlreadyCompleted,
}

impl Task {
    pub fn open(new: NewTask) -> Result<Self, CaseflowError> {
        if new.title.trim().is_empty() {
            return Err(CaseflowError::validation("task title must not be blank"));
        }
        let candidate_group = new.candidate_group.filter(|g| !g.trim().is_empty());
        if new.assignee.is_none() && candidate_group.is_none() {
            return Err(CaseflowError::validation(
                "a task needs either an assignee or a candidate group",
            ));
        }

        Ok(Self {
            id: TaskId::new(),
            case_id: new.case_id,
            kind: new.kind,
            title: new.title,
            description: new.description,
            status: TaskStatus::Open,
            assignee: new.assignee,
            candidate_group,
            priority: new.priority,
            created_at: Utc::now(),
            created_by: new.created_by,
            completion: None,
            version: 0,
        })
    }

    /// The approval task opened when a case enters PENDING_CASE_CREATION_APPROVAL
    pub fn approval_for(case: &Case, approval_group: &str) -> Result<Self, CaseflowError> {
        Self::open(NewTask {
            case_id: case.id,
            kind: TaskKind::ApproveCaseCreation,
            title: format!("Approve case creation: {}", case.case_number),
            description: Some(case.description.clone()),
            assignee: None,
            candidate_group: Some(approval_group.to_string()),
            priority: case.priority.unwrap_or_default(),
            created_by: case.created_by.clone(),
        })
    }

    /// The follow-on task created when a case is approved
    pub fn investigation_for(
        case: &Case,
        investigation_group: &str,
        created_by: UserId,
    ) -> Result<Self, CaseflowError> {
        Self::open(NewTask {
            case_id: case.id,
            kind: TaskKind::InvestigateCase,
            title: format!("Investigate case {}", case.case_number),
            description: Some(case.description.clone()),
            assignee: None,
            candidate_group: Some(investigation_group.to_string()),
            priority: case.priority.unwrap_or_default(),
            created_by,
        })
    }

    pub fn is_assigned_to(&self, user: &UserId) -> bool {
        self.assignee.as_ref() == Some(user)
    }

    /// Set or clear the assignee. Clearing returns the task to its candidate
    /// group pool.
    pub fn assign(&mut self, assignee: Option<UserId>) -> Result<(), CaseflowError> {
        self.require_active("completed tasks cannot be reassigned")?;
        if assignee.is_none() && self.candidate_group.is_none() {
            return Err(CaseflowError::validation(
                "task has no candidate group to return to; assign it to someone instead",
            ));
        }
        self.assignee = assignee;
        Ok(())
    }

    /// Take ownership. Legal only when unassigned or already held by `actor`.
    pub fn claim(&mut self, actor: &UserId) -> Result<ClaimEffect, CaseflowError> {
        self.require_active("completed tasks cannot be claimed")?;
        match &self.assignee {
            Some(current) if current == actor => Ok(ClaimEffect::AlreadyHeld),
            Some(current) => Err(CaseflowError::conflict(
                EntityKind::Task,
                self.id,
                format!("unassigned or assigned to {}", actor),
                format!("assigned to {}", current),
                "task is held by another user",
            )),
            None => {
                self.assignee = Some(actor.clone());
                Ok(ClaimEffect::Claimed)
            }
        }
    }

    pub fn complete(
        &mut self,
        actor: &UserId,
        outcome: TaskOutcome,
        comments: Option<String>,
    ) -> Result<CompletionEffect, CaseflowError> {
        if self.status == TaskStatus::Completed {
            return Ok(CompletionEffect::AlreadyCompleted);
        }
        if !self.is_assigned_to(actor) {
            return Err(CaseflowError::conflict(
                EntityKind::Task,
                self.id,
                format!("assigned to {}", actor),
                self.assignee
                    .as_ref()
                    .map(|a| format!("assigned to {}", a))
                    .unwrap_or_else(|| "unassigned".to_string()),
                "claim the task before completing it",
            ));
        }
        self.status = TaskStatus::Completed;
        self.completion = Some(TaskCompletion {
            outcome,
            completed_by: actor.clone(),
            completed_at: Utc::now(),
            comments: comments.filter(|c| !c.trim().is_empty()),
        });
        Ok(CompletionEffect::Completed)
    }

    fn require_active(&self, message: &str) -> Result<(), CaseflowError> {
        if !self.status.is_active() {
            return Err(CaseflowError::conflict(
                EntityKind::Task,
                self.id,
                TaskStatus::Open,
                self.status,
                message,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn pooled_task() -> Task {
        Task::open(NewTask {
            case_id: CaseId::new(),
            kind: TaskKind::General,
            title: "Collect statements".to_string(),
            description: None,
            assignee: None,
            candidate_group: Some("Investigations".to_string()),
            priority: Priority::Medium,
            created_by: user("admin1"),
        })
        .unwrap()
    }

    #[test]
    fn test_open_requires_assignee_or_group() {
        let result = Task::open(NewTask {
            case_id: CaseId::new(),
            kind: TaskKind::General,
            title: "Orphan".to_string(),
            description: None,
            assignee: None,
            candidate_group: Some("  ".to_string()),
            priority: Priority::Low,
            created_by: user("admin1"),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_claim_keeps_status_open() {
        let mut task = pooled_task();
        assert_eq!(task.claim(&user("analyst1")).unwrap(), ClaimEffect::Claimed);
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.claim(&user("analyst1")).unwrap(), ClaimEffect::AlreadyHeld);

        let err = task.claim(&user("analyst2")).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_unassign_returns_to_pool() {
        let mut task = pooled_task();
        task.assign(Some(user("analyst1"))).unwrap();
        task.assign(None).unwrap();
        assert!(task.assignee.is_none());
        assert_eq!(task.candidate_group.as_deref(), Some("Investigations"));
        assert_eq!(task.status, TaskStatus::Open);
    }

    #[test]
    fn test_complete_requires_claim() {
        let mut task = pooled_task();
        let err = task.complete(&user("analyst1"), TaskOutcome::Done, None).unwrap_err();
        assert!(err.is_conflict());

        task.claim(&user("analyst1")).unwrap();
        let effect = task
            .complete(&user("analyst1"), TaskOutcome::Done, Some("done".into()))
            .unwrap();
        assert_eq!(effect, CompletionEffect::Completed);
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut task = pooled_task();
        task.claim(&user("analyst1")).unwrap();
        task.complete(&user("analyst1"), TaskOutcome::Done, None).unwrap();
        let snapshot = task.clone();

        let effect = task.complete(&user("analyst1"), TaskOutcome::Done, None).unwrap();
        assert_eq!(effect, CompletionEffect::AlreadyCompleted);
        assert_eq!(task, snapshot);
    }

    #[test]
    fn test_completed_task_cannot_be_reassigned() {
        let mut task = pooled_task();
        task.claim(&user("analyst1")).unwrap();
        task.complete(&user("analyst1"), TaskOutcome::Done, None).unwrap();
        assert!(task.assign(Some(user("analyst2"))).unwrap_err().is_conflict());
    }
}
