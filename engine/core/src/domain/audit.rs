// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Append-only audit trail entries. Entries are never mutated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::case::{CaseId, CaseStatus};
use crate::domain::error::CaseflowError;
use crate::domain::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntryId(pub Uuid);

impl AuditEntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditEntryId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CaseCreated,
    CaseUpdated,
    CaseCompleted,
    CaseAbandoned,
    CaseDeleted,
    CaseApproved,
    CaseRejected,
    TaskCreated,
    TaskAssigned,
    TaskUnassigned,
    TaskClaimed,
    TaskCompleted,
}

impl AuditAction {
    pub const ALL: [AuditAction; 12] = [
        AuditAction::CaseCreated,
        AuditAction::CaseUpdated,
        AuditAction::CaseCompleted,
        AuditAction::CaseAbandoned,
        AuditAction::CaseDeleted,
        AuditAction::CaseApproved,
        AuditAction::CaseRejected,
        AuditAction::TaskCreated,
        AuditAction::TaskAssigned,
        AuditAction::TaskUnassigned,
        AuditAction::TaskClaimed,
        AuditAction::TaskCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CaseCreated => "CASE_CREATED",
            AuditAction::CaseUpdated => "CASE_UPDATED",
            AuditAction::CaseCompleted => "CASE_COMPLETED",
            AuditAction::CaseAbandoned => "CASE_ABANDONED",
            AuditAction::CaseDeleted => "CASE_DELETED",
            AuditAction::CaseApproved => "CASE_APPROVED",
            AuditAction::CaseRejected => "CASE_REJECTED",
            AuditAction::TaskCreated => "TASK_CREATED",
            AuditAction::TaskAssigned => "TASK_ASSIGNED",
            AuditAction::TaskUnassigned => "TASK_UNASSIGNED",
            AuditAction::TaskClaimed => "TASK_CLAIMED",
            AuditAction::TaskCompleted => "TASK_COMPLETED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CaseflowError::validation(format!("Invalid audit action: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub case_id: CaseId,
    pub action: AuditAction,
    pub performed_by: UserId,
    pub details: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(case_id: CaseId, action: AuditAction, performed_by: UserId, details: impl Into<String>) -> Self {
        Self {
            id: AuditEntryId::new(),
            case_id,
            action,
            performed_by,
            details: details.into(),
            old_value: None,
            new_value: None,
            timestamp: Utc::now(),
        }
    }

    /// Record the status change that accompanied this action
    pub fn with_status_change(mut self, old: CaseStatus, new: CaseStatus) -> Self {
        self.old_value = Some(old.as_str().to_string());
        self.new_value = Some(new.as_str().to_string());
        self
    }
}
