// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root: one repository per
//! aggregate, interface defined here, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `CaseRepository` | `Case` | `InMemoryCaseRepository`, `PostgresCaseRepository` |
//! | `TaskRepository` | `Task` | `InMemoryTaskRepository`, `PostgresTaskRepository` |
//! | `AuditLogRepository` | `AuditLogEntry` | `InMemoryAuditLogRepository`, `PostgresAuditLogRepository` |
//! | `UserRepository` | `User` | `InMemoryUserRepository`, `PostgresUserRepository` |
//!
//! ## Optimistic concurrency
//!
//! `update` is a compare-and-swap: the stored record must still carry the
//! version of the value passed in. On success the stored version is bumped
//! and the stored value is returned; otherwise
//! [`RepositoryError::VersionConflict`] is returned and nothing is written.
//!
//! The audit log contract has no update and no delete.

use async_trait::async_trait;

use crate::domain::audit::AuditLogEntry;
use crate::domain::case::{Case, CaseFilter, CaseId};
use crate::domain::error::EntityKind;
use crate::domain::task::{Task, TaskId, TaskKind};
use crate::domain::user::{User, UserId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Store a new case. Fails with `Duplicate` if the id or number exists.
    async fn insert(&self, case: &Case) -> Result<(), RepositoryError>;

    /// Compare-and-swap on `case.version`; returns the stored case
    async fn update(&self, case: &Case) -> Result<Case, RepositoryError>;

    async fn find_by_id(&self, id: CaseId) -> Result<Option<Case>, RepositoryError>;

    async fn find_by_number(&self, case_number: &str) -> Result<Option<Case>, RepositoryError>;

    /// Newest first
    async fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, RepositoryError>;

    async fn delete(&self, id: CaseId) -> Result<(), RepositoryError>;

    /// Next value of the per-year case number counter, starting at 1
    async fn next_case_sequence(&self, year: i32) -> Result<u32, RepositoryError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: &Task) -> Result<(), RepositoryError>;

    /// Compare-and-swap on `task.version`; returns the stored task
    async fn update(&self, task: &Task) -> Result<Task, RepositoryError>;

    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError>;

    /// All tasks of a case, oldest first
    async fn find_by_case(&self, case_id: CaseId) -> Result<Vec<Task>, RepositoryError>;

    /// Active tasks assigned to the user
    async fn find_by_assignee(&self, assignee: &UserId) -> Result<Vec<Task>, RepositoryError>;

    /// Active, unassigned tasks offered to the group
    async fn find_by_group(&self, group: &str) -> Result<Vec<Task>, RepositoryError>;

    async fn find_open_by_case_and_kind(
        &self,
        case_id: CaseId,
        kind: TaskKind,
    ) -> Result<Option<Task>, RepositoryError>;
}

/// Append-only audit trail
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), RepositoryError>;

    /// Entries for a case ordered by timestamp descending
    async fn find_by_case(&self, case_id: CaseId) -> Result<Vec<AuditLogEntry>, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Store a new user. Fails with `Duplicate` if the id is taken.
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    #[error("{entity} {id} was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        entity: EntityKind,
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Duplicate {entity}: {id}")]
    Duplicate { entity: EntityKind, id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
