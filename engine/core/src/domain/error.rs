// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Error Taxonomy
//!
//! Every core operation returns [`CaseflowError`]. Each variant carries enough
//! context (entity, id, expected vs. actual state) for the caller to render a
//! message; [`CaseflowError::code`] is the stable machine-readable code used by
//! the HTTP surface.
//!
//! The core never retries. All failures are per-request.

use serde::Serialize;
use serde_json::json;
use std::fmt;

use crate::domain::repository::RepositoryError;

/// Kind of entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Case,
    Task,
    ExternalTask,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Case => "case",
            EntityKind::Task => "task",
            EntityKind::ExternalTask => "external task",
            EntityKind::User => "user",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CaseflowError {
    /// Malformed or missing field, unknown enum value, out-of-range risk score
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Actor lacks the capability for the requested operation
    #[error("Permission denied for {actor}: {reason}")]
    Permission { actor: String, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    /// Entity is not in the state required by the transition, including lost
    /// compare-and-swap races
    #[error("Conflict on {entity} {id}: {message} (expected {expected}, found {actual})")]
    Conflict {
        entity: EntityKind,
        id: String,
        expected: String,
        actual: String,
        message: String,
    },

    /// Transport failure towards an external collaborator
    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CaseflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        CaseflowError::Validation { message: message.into() }
    }

    pub fn permission(actor: impl fmt::Display, reason: impl Into<String>) -> Self {
        CaseflowError::Permission {
            actor: actor.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        CaseflowError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(
        entity: EntityKind,
        id: impl fmt::Display,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        CaseflowError::Conflict {
            entity,
            id: id.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            message: message.into(),
        }
    }

    /// Stable error code surfaced to clients
    pub fn code(&self) -> &'static str {
        match self {
            CaseflowError::Validation { .. } => "VALIDATION_ERROR",
            CaseflowError::Permission { .. } => "PERMISSION_DENIED",
            CaseflowError::NotFound { .. } => "NOT_FOUND",
            CaseflowError::Conflict { .. } => "CONFLICT",
            CaseflowError::Network(_) => "NETWORK_ERROR",
            CaseflowError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Structured context for the error body
    pub fn details(&self) -> serde_json::Value {
        match self {
            CaseflowError::Permission { actor, .. } => json!({ "actor": actor }),
            CaseflowError::NotFound { entity, id } => json!({ "entity": entity, "id": id }),
            CaseflowError::Conflict { entity, id, expected, actual, .. } => json!({
                "entity": entity,
                "id": id,
                "expected": expected,
                "actual": actual,
            }),
            _ => serde_json::Value::Null,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CaseflowError::Conflict { .. })
    }
}

impl From<RepositoryError> for CaseflowError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::VersionConflict { entity, id, expected, actual } => {
                CaseflowError::conflict(
                    entity,
                    id,
                    format!("version {}", expected),
                    format!("version {}", actual),
                    "concurrent modification, re-read and retry",
                )
            }
            RepositoryError::NotFound { entity, id } => CaseflowError::NotFound { entity, id },
            other => CaseflowError::Storage(other.to_string()),
        }
    }
}

pub type CaseflowResult<T> = Result<T, CaseflowError>;
