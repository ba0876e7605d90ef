// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Case Repository
//!
//! `CaseRepository` backed by the `cases` table. Updates are guarded by
//! `WHERE version = $n`; a zero-row update is resolved into either
//! `NotFound` or `VersionConflict` with a follow-up read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::case::{Case, CaseFilter, CaseId, CaseStatus, CaseType, Priority, Typology};
use crate::domain::error::EntityKind;
use crate::domain::repository::{CaseRepository, RepositoryError};
use crate::domain::user::UserId;

const CASE_COLUMNS: &str = "id, case_number, status, case_type, priority, risk_score, entity, alert_id, \
     typology, description, created_by, created_at, updated_at, assignee, external_process_ref, \
     abandon_reason, version";

pub struct PostgresCaseRepository {
    pool: PgPool,
}

impl PostgresCaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_version(&self, id: CaseId) -> Result<Option<u64>, RepositoryError> {
        let row = sqlx::query("SELECT version FROM cases WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>("version") as u64))
    }
}

fn parse_column<T>(raw: Option<String>, column: &str) -> Result<Option<T>, RepositoryError>
where
    T: std::str::FromStr<Err = crate::domain::error::CaseflowError>,
{
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|e| RepositoryError::Serialization(format!("column {}: {}", column, e)))
    })
    .transpose()
}

fn parse_user(raw: String) -> Result<UserId, RepositoryError> {
    UserId::parse(&raw).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

pub(crate) fn row_to_case(row: &PgRow) -> Result<Case, RepositoryError> {
    let status: String = row.get("status");
    let status = status
        .parse::<CaseStatus>()
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    let assignee: Option<String> = row.get("assignee");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    Ok(Case {
        id: CaseId(row.get("id")),
        case_number: row.get("case_number"),
        status,
        case_type: parse_column::<CaseType>(row.get("case_type"), "case_type")?,
        priority: parse_column::<Priority>(row.get("priority"), "priority")?,
        risk_score: row.get("risk_score"),
        entity: row.get("entity"),
        alert_id: row.get("alert_id"),
        typology: parse_column::<Typology>(row.get("typology"), "typology")?,
        description: row.get("description"),
        created_by: parse_user(row.get("created_by"))?,
        created_at,
        updated_at,
        assignee: assignee.map(parse_user).transpose()?,
        external_process_ref: row.get("external_process_ref"),
        abandon_reason: row.get("abandon_reason"),
        version: row.get::<i64, _>("version") as u64,
    })
}

#[async_trait]
impl CaseRepository for PostgresCaseRepository {
    async fn insert(&self, case: &Case) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO cases (
                id, case_number, status, case_type, priority, risk_score, entity, alert_id,
                typology, description, created_by, created_at, updated_at, assignee,
                external_process_ref, abandon_reason, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(case.id.0)
        .bind(&case.case_number)
        .bind(case.status.as_str())
        .bind(case.case_type.map(|t| t.as_str()))
        .bind(case.priority.map(|p| p.as_str()))
        .bind(case.risk_score)
        .bind(&case.entity)
        .bind(&case.alert_id)
        .bind(case.typology.map(|t| t.as_str()))
        .bind(&case.description)
        .bind(case.created_by.as_str())
        .bind(case.created_at)
        .bind(case.updated_at)
        .bind(case.assignee.as_ref().map(|a| a.as_str()))
        .bind(&case.external_process_ref)
        .bind(&case.abandon_reason)
        .bind(case.version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Duplicate {
                entity: EntityKind::Case,
                id: case.case_number.clone(),
            },
            _ => RepositoryError::Database(format!("Failed to insert case: {}", e)),
        })?;

        Ok(())
    }

    async fn update(&self, case: &Case) -> Result<Case, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE cases SET
                status = $3,
                case_type = $4,
                priority = $5,
                risk_score = $6,
                entity = $7,
                alert_id = $8,
                typology = $9,
                description = $10,
                updated_at = $11,
                assignee = $12,
                external_process_ref = $13,
                abandon_reason = $14,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(case.id.0)
        .bind(case.version as i64)
        .bind(case.status.as_str())
        .bind(case.case_type.map(|t| t.as_str()))
        .bind(case.priority.map(|p| p.as_str()))
        .bind(case.risk_score)
        .bind(&case.entity)
        .bind(&case.alert_id)
        .bind(case.typology.map(|t| t.as_str()))
        .bind(&case.description)
        .bind(case.updated_at)
        .bind(case.assignee.as_ref().map(|a| a.as_str()))
        .bind(&case.external_process_ref)
        .bind(&case.abandon_reason)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update case: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(match self.current_version(case.id).await? {
                Some(actual) => RepositoryError::VersionConflict {
                    entity: EntityKind::Case,
                    id: case.id.to_string(),
                    expected: case.version,
                    actual,
                },
                None => RepositoryError::NotFound {
                    entity: EntityKind::Case,
                    id: case.id.to_string(),
                },
            });
        }

        let mut stored = case.clone();
        stored.version += 1;
        Ok(stored)
    }

    async fn find_by_id(&self, id: CaseId) -> Result<Option<Case>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM cases WHERE id = $1", CASE_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_case).transpose()
    }

    async fn find_by_number(&self, case_number: &str) -> Result<Option<Case>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM cases WHERE case_number = $1", CASE_COLUMNS))
            .bind(case_number)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_case).transpose()
    }

    async fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM cases
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR created_by = $2)
              AND ($3::TEXT IS NULL OR case_type = $3)
              AND ($4::TEXT IS NULL OR priority = $4)
            ORDER BY created_at DESC
            "#,
            CASE_COLUMNS
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.created_by.as_ref().map(|u| u.as_str()))
        .bind(filter.case_type.map(|t| t.as_str()))
        .bind(filter.priority.map(|p| p.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_case).collect()
    }

    async fn delete(&self, id: CaseId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cases WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to delete case: {}", e)))?;
        Ok(())
    }

    async fn next_case_sequence(&self, year: i32) -> Result<u32, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO case_number_sequences (year, last_value)
            VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET last_value = case_number_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i32, _>("last_value") as u32)
    }
}
