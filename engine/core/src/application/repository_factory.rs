// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory
//!
//! Picks the concrete repository for each aggregate from the configured
//! storage backend. The PostgreSQL variants need the shared pool; asking for
//! one without a pool is a bootstrap error.

use anyhow::{anyhow, Result};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::repository::{
    AuditLogRepository, CaseRepository, StorageBackend, TaskRepository, UserRepository,
};
use crate::infrastructure::repositories::{
    InMemoryAuditLogRepository, InMemoryCaseRepository, InMemoryTaskRepository, InMemoryUserRepository,
    PostgresAuditLogRepository, PostgresCaseRepository, PostgresTaskRepository, PostgresUserRepository,
};

fn require_pool(pool: Option<&PgPool>) -> Result<PgPool> {
    pool.cloned()
        .ok_or_else(|| anyhow!("PostgreSQL storage selected but no connection pool is available"))
}

pub fn create_case_repository(backend: &StorageBackend, pool: Option<&PgPool>) -> Result<Arc<dyn CaseRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryCaseRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresCaseRepository::new(require_pool(pool)?)),
    })
}

pub fn create_task_repository(backend: &StorageBackend, pool: Option<&PgPool>) -> Result<Arc<dyn TaskRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryTaskRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresTaskRepository::new(require_pool(pool)?)),
    })
}

pub fn create_audit_log_repository(
    backend: &StorageBackend,
    pool: Option<&PgPool>,
) -> Result<Arc<dyn AuditLogRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryAuditLogRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresAuditLogRepository::new(require_pool(pool)?)),
    })
}

pub fn create_user_repository(backend: &StorageBackend, pool: Option<&PgPool>) -> Result<Arc<dyn UserRepository>> {
    Ok(match backend {
        StorageBackend::InMemory => Arc::new(InMemoryUserRepository::new()),
        StorageBackend::PostgreSQL(_) => Arc::new(PostgresUserRepository::new(require_pool(pool)?)),
    })
}
