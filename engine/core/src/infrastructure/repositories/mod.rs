// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository traits defined in
//! `crate::domain::repository`.
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresCaseRepository** - cases and the per-year case number sequence
//! - **PostgresTaskRepository** - registry-native tasks
//! - **PostgresAuditLogRepository** - append-only audit trail
//! - **PostgresUserRepository** - user directory
//!
//! ## In-Memory Repositories
//!
//! HashMap-backed implementations for development and tests. Both families
//! implement the same compare-and-swap `update`: the write only happens when
//! the stored version equals the version of the value passed in.

pub mod postgres_audit;
pub mod postgres_case;
pub mod postgres_task;
pub mod postgres_user;

pub use postgres_audit::PostgresAuditLogRepository;
pub use postgres_case::PostgresCaseRepository;
pub use postgres_task::PostgresTaskRepository;
pub use postgres_user::PostgresUserRepository;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::audit::AuditLogEntry;
use crate::domain::case::{Case, CaseFilter, CaseId};
use crate::domain::error::EntityKind;
use crate::domain::repository::{
    AuditLogRepository, CaseRepository, RepositoryError, TaskRepository, UserRepository,
};
use crate::domain::task::{Task, TaskId, TaskKind};
use crate::domain::user::{User, UserId};

#[derive(Clone, Default)]
pub struct InMemoryCaseRepository {
    cases: Arc<RwLock<HashMap<CaseId, Case>>>,
    sequences: Arc<Mutex<HashMap<i32, u32>>>,
}

impl InMemoryCaseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn insert(&self, case: &Case) -> Result<(), RepositoryError> {
        let mut cases = self.cases.write();
        if cases.contains_key(&case.id) || cases.values().any(|c| c.case_number == case.case_number) {
            return Err(RepositoryError::Duplicate {
                entity: EntityKind::Case,
                id: case.case_number.clone(),
            });
        }
        cases.insert(case.id, case.clone());
        Ok(())
    }

    async fn update(&self, case: &Case) -> Result<Case, RepositoryError> {
        let mut cases = self.cases.write();
        let stored = cases.get_mut(&case.id).ok_or_else(|| RepositoryError::NotFound {
            entity: EntityKind::Case,
            id: case.id.to_string(),
        })?;
        if stored.version != case.version {
            return Err(RepositoryError::VersionConflict {
                entity: EntityKind::Case,
                id: case.id.to_string(),
                expected: case.version,
                actual: stored.version,
            });
        }
        let mut next = case.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn find_by_id(&self, id: CaseId) -> Result<Option<Case>, RepositoryError> {
        Ok(self.cases.read().get(&id).cloned())
    }

    async fn find_by_number(&self, case_number: &str) -> Result<Option<Case>, RepositoryError> {
        Ok(self
            .cases
            .read()
            .values()
            .find(|c| c.case_number == case_number)
            .cloned())
    }

    async fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, RepositoryError> {
        let mut cases: Vec<Case> = self
            .cases
            .read()
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        cases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cases)
    }

    async fn delete(&self, id: CaseId) -> Result<(), RepositoryError> {
        self.cases.write().remove(&id);
        Ok(())
    }

    async fn next_case_sequence(&self, year: i32) -> Result<u32, RepositoryError> {
        let mut sequences = self.sequences.lock();
        let counter = sequences.entry(year).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted(&self, predicate: impl Fn(&Task) -> bool) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.read().values().filter(|t| predicate(t)).cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        tasks
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn insert(&self, task: &Task) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.write();
        if tasks.contains_key(&task.id) {
            return Err(RepositoryError::Duplicate {
                entity: EntityKind::Task,
                id: task.id.to_string(),
            });
        }
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn update(&self, task: &Task) -> Result<Task, RepositoryError> {
        let mut tasks = self.tasks.write();
        let stored = tasks.get_mut(&task.id).ok_or_else(|| RepositoryError::NotFound {
            entity: EntityKind::Task,
            id: task.id.to_string(),
        })?;
        if stored.version != task.version {
            return Err(RepositoryError::VersionConflict {
                entity: EntityKind::Task,
                id: task.id.to_string(),
                expected: task.version,
                actual: stored.version,
            });
        }
        let mut next = task.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tasks.read().get(&id).cloned())
    }

    async fn find_by_case(&self, case_id: CaseId) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.collect_sorted(|t| t.case_id == case_id))
    }

    async fn find_by_assignee(&self, assignee: &UserId) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.collect_sorted(|t| t.status.is_active() && t.is_assigned_to(assignee)))
    }

    async fn find_by_group(&self, group: &str) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.collect_sorted(|t| {
            t.status.is_active() && t.assignee.is_none() && t.candidate_group.as_deref() == Some(group)
        }))
    }

    async fn find_open_by_case_and_kind(
        &self,
        case_id: CaseId,
        kind: TaskKind,
    ) -> Result<Option<Task>, RepositoryError> {
        Ok(self
            .collect_sorted(|t| t.case_id == case_id && t.kind == kind && t.status.is_active())
            .into_iter()
            .next())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAuditLogRepository {
    entries: Arc<RwLock<Vec<AuditLogEntry>>>,
}

impl InMemoryAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), RepositoryError> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    async fn find_by_case(&self, case_id: CaseId) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        // Insertion order breaks timestamp ties so the newest append comes first
        let entries = self.entries.read();
        let mut matching: Vec<(usize, AuditLogEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.case_id == case_id)
            .map(|(i, e)| (i, e.clone()))
            .collect();
        matching.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));
        Ok(matching.into_iter().map(|(_, e)| e).collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.write();
        if users.contains_key(&user.id) {
            return Err(RepositoryError::Duplicate {
                entity: EntityKind::User,
                id: user.id.to_string(),
            });
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}
