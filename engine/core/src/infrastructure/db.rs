// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that is
//! injected into every PostgreSQL repository. Schema migrations under
//! `engine/core/migrations` are embedded and applied on connect.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date
    pub async fn connect_and_migrate(connection_string: &str) -> Result<Self> {
        let db = Self::new(connection_string).await?;
        sqlx::migrate!("./migrations")
            .run(&db.pool)
            .await
            .context("Failed to apply database migrations")?;
        tracing::info!("Database migrations applied");
        Ok(db)
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}
