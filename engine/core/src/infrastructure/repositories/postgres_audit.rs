// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `AuditLogRepository`. The table rejects UPDATE and DELETE at
//! the database level (see `migrations/0001_init.sql`).

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::audit::{AuditAction, AuditEntryId, AuditLogEntry};
use crate::domain::case::CaseId;
use crate::domain::repository::{AuditLogRepository, RepositoryError};
use crate::domain::user::UserId;

pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, case_id, action, performed_by, details, old_value, new_value, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.0)
        .bind(entry.case_id.0)
        .bind(entry.action.as_str())
        .bind(entry.performed_by.as_str())
        .bind(&entry.details)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to append audit entry: {}", e)))?;

        Ok(())
    }

    async fn find_by_case(&self, case_id: CaseId) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, case_id, action, performed_by, details, old_value, new_value, timestamp
            FROM audit_log
            WHERE case_id = $1
            ORDER BY timestamp DESC, seq DESC
            "#,
        )
        .bind(case_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let action: String = row.get("action");
            let performed_by: String = row.get("performed_by");
            entries.push(AuditLogEntry {
                id: AuditEntryId(row.get("id")),
                case_id: CaseId(row.get("case_id")),
                action: action
                    .parse::<AuditAction>()
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
                performed_by: UserId::parse(&performed_by)
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
                details: row.get("details"),
                old_value: row.get("old_value"),
                new_value: row.get("new_value"),
                timestamp: row.get("timestamp"),
            });
        }
        Ok(entries)
    }
}
