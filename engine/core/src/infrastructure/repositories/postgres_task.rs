// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `TaskRepository`. Completion details are stored as JSONB.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::case::{CaseId, Priority};
use crate::domain::error::EntityKind;
use crate::domain::repository::{RepositoryError, TaskRepository};
use crate::domain::task::{Task, TaskCompletion, TaskId, TaskKind, TaskStatus};
use crate::domain::user::UserId;

const TASK_COLUMNS: &str = "id, case_id, kind, title, description, status, assignee, candidate_group, \
     priority, created_at, created_by, completion, version";

pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, clause: &str, bind: String) -> Result<Vec<Task>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tasks WHERE {} ORDER BY created_at ASC",
            TASK_COLUMNS, clause
        ))
        .bind(bind)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_task).collect()
    }
}

fn serialization<E: std::fmt::Display>(e: E) -> RepositoryError {
    RepositoryError::Serialization(e.to_string())
}

fn row_to_task(row: &PgRow) -> Result<Task, RepositoryError> {
    let kind: String = row.get("kind");
    let status: String = row.get("status");
    let priority: String = row.get("priority");
    let assignee: Option<String> = row.get("assignee");
    let created_by: String = row.get("created_by");
    let completion: Option<serde_json::Value> = row.get("completion");

    Ok(Task {
        id: TaskId(row.get("id")),
        case_id: CaseId(row.get("case_id")),
        kind: kind.parse::<TaskKind>().map_err(serialization)?,
        title: row.get("title"),
        description: row.get("description"),
        status: status.parse::<TaskStatus>().map_err(serialization)?,
        assignee: assignee
            .map(|a| UserId::parse(&a))
            .transpose()
            .map_err(serialization)?,
        candidate_group: row.get("candidate_group"),
        priority: priority.parse::<Priority>().map_err(serialization)?,
        created_at: row.get("created_at"),
        created_by: UserId::parse(&created_by).map_err(serialization)?,
        completion: completion
            .map(serde_json::from_value::<TaskCompletion>)
            .transpose()?,
        version: row.get::<i64, _>("version") as u64,
    })
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn insert(&self, task: &Task) -> Result<(), RepositoryError> {
        let completion = task.completion.as_ref().map(serde_json::to_value).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, case_id, kind, title, description, status, assignee, candidate_group,
                priority, created_at, created_by, completion, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(task.id.0)
        .bind(task.case_id.0)
        .bind(task.kind.as_str())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.assignee.as_ref().map(|a| a.as_str()))
        .bind(&task.candidate_group)
        .bind(task.priority.as_str())
        .bind(task.created_at)
        .bind(task.created_by.as_str())
        .bind(completion)
        .bind(task.version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Duplicate {
                entity: EntityKind::Task,
                id: task.id.to_string(),
            },
            _ => RepositoryError::Database(format!("Failed to insert task: {}", e)),
        })?;

        Ok(())
    }

    async fn update(&self, task: &Task) -> Result<Task, RepositoryError> {
        let completion = task.completion.as_ref().map(serde_json::to_value).transpose()?;

        let row = sqlx::query(
            r#"
            UPDATE tasks SET
                title = $3,
                description = $4,
                status = $5,
                assignee = $6,
                candidate_group = $7,
                priority = $8,
                completion = $9,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(task.id.0)
        .bind(task.version as i64)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.assignee.as_ref().map(|a| a.as_str()))
        .bind(&task.candidate_group)
        .bind(task.priority.as_str())
        .bind(completion)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update task: {}", e)))?;

        match row {
            Some(row) => {
                let mut stored = task.clone();
                stored.version = row.get::<i64, _>("version") as u64;
                Ok(stored)
            }
            None => {
                let current = sqlx::query("SELECT version FROM tasks WHERE id = $1")
                    .bind(task.id.0)
                    .fetch_optional(&self.pool)
                    .await?;
                Err(match current {
                    Some(current) => RepositoryError::VersionConflict {
                        entity: EntityKind::Task,
                        id: task.id.to_string(),
                        expected: task.version,
                        actual: current.get::<i64, _>("version") as u64,
                    },
                    None => RepositoryError::NotFound {
                        entity: EntityKind::Task,
                        id: task.id.to_string(),
                    },
                })
            }
        }
    }

    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn find_by_case(&self, case_id: CaseId) -> Result<Vec<Task>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tasks WHERE case_id = $1 ORDER BY created_at ASC",
            TASK_COLUMNS
        ))
        .bind(case_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn find_by_assignee(&self, assignee: &UserId) -> Result<Vec<Task>, RepositoryError> {
        self.fetch_where("assignee = $1 AND status <> 'COMPLETED'", assignee.to_string())
            .await
    }

    async fn find_by_group(&self, group: &str) -> Result<Vec<Task>, RepositoryError> {
        self.fetch_where(
            "candidate_group = $1 AND assignee IS NULL AND status <> 'COMPLETED'",
            group.to_string(),
        )
        .await
    }

    async fn find_open_by_case_and_kind(
        &self,
        case_id: CaseId,
        kind: TaskKind,
    ) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM tasks WHERE case_id = $1 AND kind = $2 AND status <> 'COMPLETED' \
             ORDER BY created_at ASC LIMIT 1",
            TASK_COLUMNS
        ))
        .bind(case_id.0)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_task).transpose()
    }
}
