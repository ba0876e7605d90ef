// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Case Aggregate
//!
//! A `Case` is a tracked investigation record. Its status moves only along
//! these edges:
//!
//! ```text
//! DRAFT ──complete──▶ PENDING_CASE_CREATION_APPROVAL ──approve──▶ READY_FOR_ASSIGNMENT
//!   │                          │
//!   └──abandon──▶ ABANDONED    └──reject──▶ REJECTED
//! ```
//!
//! ABANDONED and REJECTED are terminal. A case created with every
//! classification attribute skips DRAFT and starts in
//! PENDING_CASE_CREATION_APPROVAL.
//!
//! ## Classification
//!
//! `case_type`, `priority`, `description` and `risk_score` must all be set
//! before a case may leave DRAFT. `description` is mandatory from creation
//! onwards regardless of status.
//!
//! Approval and rejection are `pub(crate)`: only the approval coordinator
//! drives them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::error::{CaseflowError, EntityKind};
use crate::domain::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseId(pub Uuid);

impl CaseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for CaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Draft,
    PendingCaseCreationApproval,
    ReadyForAssignment,
    Abandoned,
    Rejected,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 5] = [
        CaseStatus::Draft,
        CaseStatus::PendingCaseCreationApproval,
        CaseStatus::ReadyForAssignment,
        CaseStatus::Abandoned,
        CaseStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Draft => "DRAFT",
            CaseStatus::PendingCaseCreationApproval => "PENDING_CASE_CREATION_APPROVAL",
            CaseStatus::ReadyForAssignment => "READY_FOR_ASSIGNMENT",
            CaseStatus::Abandoned => "ABANDONED",
            CaseStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Abandoned | CaseStatus::Rejected)
    }

    /// The complete edge set of the case state machine
    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        matches!(
            (self, next),
            (CaseStatus::Draft, CaseStatus::PendingCaseCreationApproval)
                | (CaseStatus::Draft, CaseStatus::Abandoned)
                | (CaseStatus::PendingCaseCreationApproval, CaseStatus::ReadyForAssignment)
                | (CaseStatus::PendingCaseCreationApproval, CaseStatus::Rejected)
        )
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CaseStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CaseflowError::validation(format!("Invalid case status: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseType {
    FraudDetection,
    MoneyLaundering,
    SuspiciousActivity,
    ComplianceViolation,
    Aml,
    Fraud,
    Compliance,
    Sanctions,
    Kyc,
}

impl CaseType {
    pub const ALL: [CaseType; 9] = [
        CaseType::FraudDetection,
        CaseType::MoneyLaundering,
        CaseType::SuspiciousActivity,
        CaseType::ComplianceViolation,
        CaseType::Aml,
        CaseType::Fraud,
        CaseType::Compliance,
        CaseType::Sanctions,
        CaseType::Kyc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseType::FraudDetection => "FRAUD_DETECTION",
            CaseType::MoneyLaundering => "MONEY_LAUNDERING",
            CaseType::SuspiciousActivity => "SUSPICIOUS_ACTIVITY",
            CaseType::ComplianceViolation => "COMPLIANCE_VIOLATION",
            CaseType::Aml => "AML",
            CaseType::Fraud => "FRAUD",
            CaseType::Compliance => "COMPLIANCE",
            CaseType::Sanctions => "SANCTIONS",
            CaseType::Kyc => "KYC",
        }
    }
}

impl FromStr for CaseType {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CaseType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CaseflowError::validation(format!("Invalid case type: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl FromStr for Priority {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CaseflowError::validation(format!("Invalid priority: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Typology {
    MoneyLaundering,
    TerroristFinancing,
    Fraud,
    SanctionsViolation,
}

impl Typology {
    pub const ALL: [Typology; 4] = [
        Typology::MoneyLaundering,
        Typology::TerroristFinancing,
        Typology::Fraud,
        Typology::SanctionsViolation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Typology::MoneyLaundering => "MONEY_LAUNDERING",
            Typology::TerroristFinancing => "TERRORIST_FINANCING",
            Typology::Fraud => "FRAUD",
            Typology::SanctionsViolation => "SANCTIONS_VIOLATION",
        }
    }
}

impl FromStr for Typology {
    type Err = CaseflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Typology::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CaseflowError::validation(format!("Invalid typology: {}", s)))
    }
}

pub const MIN_RISK_SCORE: f64 = 0.0;
pub const MAX_RISK_SCORE: f64 = 100.0;

/// Attributes supplied by create, edit and complete. `None` leaves the
/// current value untouched when merged into an existing case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFields {
    pub case_type: Option<CaseType>,
    pub priority: Option<Priority>,
    pub risk_score: Option<f64>,
    pub entity: Option<String>,
    pub alert_id: Option<String>,
    pub typology: Option<Typology>,
    pub description: Option<String>,
}

impl CaseFields {
    pub fn validate(&self) -> Result<(), CaseflowError> {
        if let Some(score) = self.risk_score {
            if !score.is_finite() || !(MIN_RISK_SCORE..=MAX_RISK_SCORE).contains(&score) {
                return Err(CaseflowError::validation(format!(
                    "Risk score must be between {} and {}, got {}",
                    MIN_RISK_SCORE, MAX_RISK_SCORE, score
                )));
            }
        }
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                return Err(CaseflowError::validation("description must not be blank"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: CaseId,
    pub case_number: String,
    pub status: CaseStatus,
    pub case_type: Option<CaseType>,
    pub priority: Option<Priority>,
    pub risk_score: Option<f64>,
    pub entity: Option<String>,
    pub alert_id: Option<String>,
    pub typology: Option<Typology>,
    pub description: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assignee: Option<UserId>,
    pub external_process_ref: Option<String>,
    pub abandon_reason: Option<String>,
    /// Optimistic concurrency token, bumped by the repository on every write
    pub version: u64,
}

impl Case {
    /// Build a new case. Starts in PENDING_CASE_CREATION_APPROVAL when every
    /// classification attribute is present, DRAFT otherwise.
    pub fn open(case_number: String, fields: CaseFields, created_by: UserId) -> Result<Self, CaseflowError> {
        fields.validate()?;
        let description = fields
            .description
            .clone()
            .ok_or_else(|| CaseflowError::validation("description is required"))?;

        let now = Utc::now();
        let mut case = Self {
            id: CaseId::new(),
            case_number,
            status: CaseStatus::Draft,
            case_type: fields.case_type,
            priority: fields.priority,
            risk_score: fields.risk_score,
            entity: fields.entity,
            alert_id: fields.alert_id,
            typology: fields.typology,
            description,
            created_by,
            created_at: now,
            updated_at: now,
            assignee: None,
            external_process_ref: None,
            abandon_reason: None,
            version: 0,
        };

        if case.is_classification_complete() {
            case.transition(CaseStatus::PendingCaseCreationApproval)?;
        }
        Ok(case)
    }

    pub fn is_classification_complete(&self) -> bool {
        self.missing_classification().is_empty()
    }

    /// Names of the classification attributes still unset
    pub fn missing_classification(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.case_type.is_none() {
            missing.push("caseType");
        }
        if self.priority.is_none() {
            missing.push("priority");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.risk_score.is_none() {
            missing.push("riskScore");
        }
        missing
    }

    /// Update attributes of a DRAFT case without promoting it
    pub fn edit(&mut self, fields: CaseFields) -> Result<(), CaseflowError> {
        self.require_status(CaseStatus::Draft, "only DRAFT cases can be edited")?;
        fields.validate()?;
        self.merge(fields);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Fill in classification attributes and submit the case for approval.
    /// Leaves the case untouched on any failure.
    pub fn complete(&mut self, fields: CaseFields) -> Result<(), CaseflowError> {
        self.require_status(CaseStatus::Draft, "only DRAFT cases can be completed")?;
        fields.validate()?;

        let mut candidate = self.clone();
        candidate.merge(fields);
        let missing = candidate.missing_classification();
        if !missing.is_empty() {
            return Err(CaseflowError::validation(format!(
                "case cannot be completed, missing: {}",
                missing.join(", ")
            )));
        }
        candidate.transition(CaseStatus::PendingCaseCreationApproval)?;
        *self = candidate;
        Ok(())
    }

    /// Abandon a DRAFT case. Only its creator may do so, and a reason is required.
    pub fn abandon(&mut self, actor: &UserId, reason: &str) -> Result<(), CaseflowError> {
        if actor != &self.created_by {
            return Err(CaseflowError::permission(
                actor,
                format!("only the creator ({}) may abandon case {}", self.created_by, self.case_number),
            ));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CaseflowError::validation("an abandonment reason is required"));
        }
        self.require_status(CaseStatus::Draft, "only DRAFT cases can be abandoned")?;
        self.transition(CaseStatus::Abandoned)?;
        self.abandon_reason = Some(reason.to_string());
        Ok(())
    }

    pub(crate) fn approve(&mut self) -> Result<(), CaseflowError> {
        self.require_status(CaseStatus::PendingCaseCreationApproval, "case is not pending approval")?;
        self.transition(CaseStatus::ReadyForAssignment)
    }

    pub(crate) fn reject(&mut self) -> Result<(), CaseflowError> {
        self.require_status(CaseStatus::PendingCaseCreationApproval, "case is not pending approval")?;
        self.transition(CaseStatus::Rejected)
    }

    /// Record the external workflow instance driving an approved case
    pub fn attach_process_reference(&mut self, reference: String) -> Result<(), CaseflowError> {
        self.require_status(
            CaseStatus::ReadyForAssignment,
            "process references are only recorded on cases ready for assignment",
        )?;
        self.external_process_ref = Some(reference);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_assignee(&mut self, assignee: Option<UserId>) {
        self.assignee = assignee;
        self.updated_at = Utc::now();
    }

    /// Whether an external process should gate this case on extra review
    pub fn requires_escalated_review(&self) -> bool {
        matches!(self.priority, Some(Priority::High | Priority::Critical))
            || self.risk_score.map(|score| score > 80.0).unwrap_or(false)
    }

    fn require_status(&self, expected: CaseStatus, message: &str) -> Result<(), CaseflowError> {
        if self.status != expected {
            return Err(CaseflowError::conflict(
                EntityKind::Case,
                self.id,
                expected,
                self.status,
                message,
            ));
        }
        Ok(())
    }

    fn transition(&mut self, next: CaseStatus) -> Result<(), CaseflowError> {
        if !self.status.can_transition_to(next) {
            return Err(CaseflowError::conflict(
                EntityKind::Case,
                self.id,
                format!("a status that may move to {}", next),
                self.status,
                "illegal status transition",
            ));
        }
        if matches!(next, CaseStatus::PendingCaseCreationApproval | CaseStatus::ReadyForAssignment) {
            let missing = self.missing_classification();
            if !missing.is_empty() {
                return Err(CaseflowError::validation(format!(
                    "classification incomplete, missing: {}",
                    missing.join(", ")
                )));
            }
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn merge(&mut self, fields: CaseFields) {
        if let Some(case_type) = fields.case_type {
            self.case_type = Some(case_type);
        }
        if let Some(priority) = fields.priority {
            self.priority = Some(priority);
        }
        if let Some(score) = fields.risk_score {
            self.risk_score = Some(score);
        }
        if let Some(entity) = fields.entity {
            self.entity = Some(entity);
        }
        if let Some(alert_id) = fields.alert_id {
            self.alert_id = Some(alert_id);
        }
        if let Some(typology) = fields.typology {
            self.typology = Some(typology);
        }
        if let Some(description) = fields.description {
            self.description = description;
        }
    }
}

/// Filter for case listings. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub created_by: Option<UserId>,
    pub case_type: Option<CaseType>,
    pub priority: Option<Priority>,
}

impl CaseFilter {
    pub fn matches(&self, case: &Case) -> bool {
        self.status.map_or(true, |s| case.status == s)
            && self.created_by.as_ref().map_or(true, |u| &case.created_by == u)
            && self.case_type.map_or(true, |t| case.case_type == Some(t))
            && self.priority.map_or(true, |p| case.priority == Some(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn full_fields() -> CaseFields {
        CaseFields {
            case_type: Some(CaseType::MoneyLaundering),
            priority: Some(Priority::High),
            risk_score: Some(75.0),
            entity: Some("ACME Ltd".to_string()),
            alert_id: Some("ALERT-9".to_string()),
            typology: Some(Typology::MoneyLaundering),
            description: Some("Structured deposits".to_string()),
        }
    }

    fn draft_fields() -> CaseFields {
        CaseFields {
            description: Some("Needs more detail".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_edge_set_is_closed() {
        let allowed = [
            (CaseStatus::Draft, CaseStatus::PendingCaseCreationApproval),
            (CaseStatus::Draft, CaseStatus::Abandoned),
            (CaseStatus::PendingCaseCreationApproval, CaseStatus::ReadyForAssignment),
            (CaseStatus::PendingCaseCreationApproval, CaseStatus::Rejected),
        ];
        for from in CaseStatus::ALL {
            for to in CaseStatus::ALL {
                assert_eq!(from.can_transition_to(to), allowed.contains(&(from, to)), "{} -> {}", from, to);
            }
        }
        assert!(!CaseStatus::Rejected.can_transition_to(CaseStatus::Draft));
    }

    #[test]
    fn test_open_with_full_fields_is_pending() {
        let case = Case::open("CASE-2026-0001".into(), full_fields(), user("analyst1")).unwrap();
        assert_eq!(case.status, CaseStatus::PendingCaseCreationApproval);
    }

    #[test]
    fn test_open_with_partial_fields_is_draft() {
        let fields = CaseFields {
            case_type: Some(CaseType::Fraud),
            ..draft_fields()
        };
        let case = Case::open("CASE-2026-0002".into(), fields, user("analyst1")).unwrap();
        assert_eq!(case.status, CaseStatus::Draft);
        assert_eq!(case.missing_classification(), vec!["priority", "riskScore"]);
    }

    #[test]
    fn test_open_requires_description() {
        let fields = CaseFields {
            description: None,
            ..full_fields()
        };
        let err = Case::open("CASE-2026-0003".into(), fields, user("analyst1")).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_risk_score_bounds() {
        for bad in [-0.5, 100.01, f64::NAN] {
            let fields = CaseFields {
                risk_score: Some(bad),
                ..full_fields()
            };
            assert!(Case::open("CASE-X".into(), fields, user("analyst1")).is_err());
        }
        for good in [0.0, 100.0] {
            let fields = CaseFields {
                risk_score: Some(good),
                ..full_fields()
            };
            assert!(Case::open("CASE-X".into(), fields, user("analyst1")).is_ok());
        }
    }

    #[test]
    fn test_complete_draft_moves_to_pending() {
        let mut case = Case::open("CASE-1".into(), draft_fields(), user("analyst1")).unwrap();
        case.complete(full_fields()).unwrap();
        assert_eq!(case.status, CaseStatus::PendingCaseCreationApproval);
        assert_eq!(case.case_type, Some(CaseType::MoneyLaundering));
    }

    #[test]
    fn test_complete_with_missing_fields_leaves_case_untouched() {
        let mut case = Case::open("CASE-1".into(), draft_fields(), user("analyst1")).unwrap();
        let before = case.clone();
        let err = case
            .complete(CaseFields {
                priority: Some(Priority::Low),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(case, before);
    }

    #[test]
    fn test_complete_outside_draft_conflicts() {
        let mut case = Case::open("CASE-1".into(), full_fields(), user("analyst1")).unwrap();
        let err = case.complete(full_fields()).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_abandon_rules() {
        let mut case = Case::open("CASE-1".into(), draft_fields(), user("analyst1")).unwrap();
        let before = case.clone();

        let err = case.abandon(&user("analyst2"), "dup").unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");
        let err = case.abandon(&user("analyst1"), "  ").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(case, before);

        case.abandon(&user("analyst1"), "duplicate of CASE-0").unwrap();
        assert_eq!(case.status, CaseStatus::Abandoned);
        assert_eq!(case.abandon_reason.as_deref(), Some("duplicate of CASE-0"));

        let err = case.abandon(&user("analyst1"), "again").unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_reject_is_terminal() {
        let mut case = Case::open("CASE-1".into(), full_fields(), user("analyst1")).unwrap();
        case.reject().unwrap();
        assert_eq!(case.status, CaseStatus::Rejected);
        assert!(case.approve().is_err());
        assert!(case.edit(draft_fields()).is_err());
    }

    #[test]
    fn test_process_reference_requires_ready_case() {
        let mut case = Case::open("CASE-1".into(), full_fields(), user("analyst1")).unwrap();
        assert!(case.attach_process_reference("proc-1".into()).is_err());
        case.approve().unwrap();
        case.attach_process_reference("proc-1".into()).unwrap();
        assert_eq!(case.external_process_ref.as_deref(), Some("proc-1"));
    }

    #[test]
    fn test_status_parse_rejects_unknown_values() {
        assert_eq!("DRAFT".parse::<CaseStatus>().unwrap(), CaseStatus::Draft);
        assert!("CLOSED".parse::<CaseStatus>().is_err());
        assert!("fraud".parse::<CaseType>().is_err());
    }
}
