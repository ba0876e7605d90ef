// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Service wiring: builds the repositories, workflow runtime adapter and
//! application services from a [`CaseflowConfig`].

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::application::approval_coordinator::{ApprovalCoordinator, StandardApprovalCoordinator};
use crate::application::audit_log::AuditLogService;
use crate::application::case_registry::{CaseRegistry, StandardCaseRegistry};
use crate::application::repository_factory::{
    create_audit_log_repository, create_case_repository, create_task_repository, create_user_repository,
};
use crate::application::task_store::{StandardTaskStore, TaskStore};
use crate::application::user_directory::UserDirectory;
use crate::application::WorkflowSettings;
use crate::domain::config::{resolve_secret, CaseflowConfig, ExternalRuntimeConfig};
use crate::domain::error::CaseflowResult;
use crate::domain::repository::{AuditLogRepository, CaseRepository, StorageBackend, TaskRepository, UserRepository};
use crate::domain::user::User;
use crate::domain::workflow_runtime::WorkflowRuntime;
use crate::infrastructure::db::Database;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::repositories::{
    InMemoryAuditLogRepository, InMemoryCaseRepository, InMemoryTaskRepository, InMemoryUserRepository,
};
use crate::infrastructure::workflow_runtime::{HttpWorkflowRuntime, InMemoryWorkflowRuntime};

/// One repository per aggregate
#[derive(Clone)]
pub struct Repositories {
    pub cases: Arc<dyn CaseRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub audit: Arc<dyn AuditLogRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            cases: Arc::new(InMemoryCaseRepository::new()),
            tasks: Arc::new(InMemoryTaskRepository::new()),
            audit: Arc::new(InMemoryAuditLogRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
        }
    }
}

#[derive(Clone)]
pub struct CaseflowServices {
    pub cases: Arc<dyn CaseRegistry>,
    pub tasks: Arc<dyn TaskStore>,
    pub approvals: Arc<dyn ApprovalCoordinator>,
    pub audit: AuditLogService,
    pub users: UserDirectory,
    pub event_bus: Arc<EventBus>,
    pub runtime: Option<Arc<dyn WorkflowRuntime>>,
}

impl CaseflowServices {
    pub fn assemble(
        repositories: Repositories,
        runtime: Option<Arc<dyn WorkflowRuntime>>,
        settings: WorkflowSettings,
    ) -> Self {
        let event_bus = Arc::new(EventBus::with_default_capacity());
        let audit = AuditLogService::new(repositories.audit.clone());
        let users = UserDirectory::new(repositories.users.clone());

        let cases: Arc<dyn CaseRegistry> = Arc::new(StandardCaseRegistry::new(
            repositories.cases.clone(),
            repositories.tasks.clone(),
            audit.clone(),
            event_bus.clone(),
            settings.clone(),
        ));
        let tasks: Arc<dyn TaskStore> = Arc::new(StandardTaskStore::new(
            repositories.tasks.clone(),
            repositories.cases.clone(),
            cases.clone(),
            runtime.clone(),
            users.clone(),
            audit.clone(),
            event_bus.clone(),
        ));
        let approvals: Arc<dyn ApprovalCoordinator> = Arc::new(StandardApprovalCoordinator::new(
            repositories.cases,
            repositories.tasks,
            runtime.clone(),
            audit.clone(),
            event_bus.clone(),
            settings,
        ));

        Self {
            cases,
            tasks,
            approvals,
            audit,
            users,
            event_bus,
            runtime,
        }
    }

    /// In-memory services with the given users seeded
    pub async fn in_memory(
        settings: WorkflowSettings,
        runtime: Option<Arc<dyn WorkflowRuntime>>,
        users: &[User],
    ) -> CaseflowResult<Self> {
        let services = Self::assemble(Repositories::in_memory(), runtime, settings);
        services.users.seed(users).await?;
        Ok(services)
    }

    /// Build everything the config asks for: connect and migrate PostgreSQL
    /// when selected, construct the workflow runtime adapter, seed users.
    pub async fn build(config: &CaseflowConfig) -> Result<Self> {
        let backend = config.storage_backend()?;
        let database = match &backend {
            StorageBackend::PostgreSQL(pg) => Some(Database::connect_and_migrate(&pg.connection_string).await?),
            StorageBackend::InMemory => None,
        };
        let pool = database.as_ref().map(|db| db.get_pool());

        let repositories = Repositories {
            cases: create_case_repository(&backend, pool)?,
            tasks: create_task_repository(&backend, pool)?,
            audit: create_audit_log_repository(&backend, pool)?,
            users: create_user_repository(&backend, pool)?,
        };

        let workflow = &config.spec.workflow;
        let runtime: Option<Arc<dyn WorkflowRuntime>> = match &workflow.external_runtime {
            ExternalRuntimeConfig::Disabled => None,
            ExternalRuntimeConfig::InMemory => {
                Some(Arc::new(InMemoryWorkflowRuntime::new(workflow.investigation_group.clone())))
            }
            ExternalRuntimeConfig::Http {
                base_url,
                username,
                password,
            } => {
                let mut adapter = HttpWorkflowRuntime::new(base_url.clone());
                if let Some(username) = username {
                    let password = password
                        .as_deref()
                        .map(resolve_secret)
                        .transpose()
                        .context("Failed to resolve workflow runtime password")?;
                    adapter = adapter.with_basic_auth(username.clone(), password);
                }
                Some(Arc::new(adapter))
            }
        };

        let storage = match backend {
            StorageBackend::InMemory => "in-memory",
            StorageBackend::PostgreSQL(_) => "postgres",
        };
        info!(
            storage,
            external_runtime = runtime.is_some(),
            "Caseflow services configured"
        );

        let services = Self::assemble(repositories, runtime, WorkflowSettings::from(workflow));
        services
            .users
            .seed(&config.seed_users()?)
            .await
            .context("Failed to seed configured users")?;
        Ok(services)
    }
}
