// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::error::EntityKind;
use crate::domain::repository::{RepositoryError, UserRepository};
use crate::domain::user::{Role, User, UserId};

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &PgRow) -> Result<User, RepositoryError> {
    let id: String = row.get("id");
    let role: String = row.get("role");
    Ok(User {
        id: UserId::parse(&id).map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        display_name: row.get("display_name"),
        role: role
            .parse::<Role>()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
    })
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO users (id, display_name, role) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING",
        )
        .bind(user.id.as_str())
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to insert user: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Duplicate {
                entity: EntityKind::User,
                id: user.id.to_string(),
            });
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, display_name, role FROM users WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query("SELECT id, display_name, role FROM users ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_user).collect()
    }
}
