// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use caseflow_core::application::services::Repositories;
use caseflow_core::application::{CaseflowServices, WorkflowSettings};
use caseflow_core::domain::case::{Case, CaseFields, CaseFilter, CaseId, CaseType, Priority, Typology};
use caseflow_core::domain::repository::{CaseRepository, RepositoryError};
use caseflow_core::domain::user::{Actor, Role, User, UserId};
use caseflow_core::domain::workflow_runtime::WorkflowRuntime;
use caseflow_core::infrastructure::repositories::InMemoryCaseRepository;
use parking_lot::Mutex;

pub fn users() -> Vec<User> {
    [
        ("analyst1", "John Analyst", Role::Analyst),
        ("analyst2", "Jane Analyst", Role::Analyst),
        ("admin1", "Sarah Admin", Role::Admin),
        ("admin2", "Mike Supervisor", Role::Admin),
    ]
    .into_iter()
    .map(|(id, name, role)| User {
        id: UserId::parse(id).unwrap(),
        display_name: name.to_string(),
        role,
    })
    .collect()
}

pub fn actor(id: &str) -> Actor {
    users()
        .into_iter()
        .find(|u| u.id.as_str() == id)
        .map(|u| u.actor())
        .unwrap_or_else(|| panic!("unknown test user {}", id))
}

pub async fn services() -> CaseflowServices {
    CaseflowServices::in_memory(WorkflowSettings::default(), None, &users())
        .await
        .unwrap()
}

pub async fn services_with_runtime(runtime: Arc<dyn WorkflowRuntime>) -> CaseflowServices {
    CaseflowServices::in_memory(WorkflowSettings::default(), Some(runtime), &users())
        .await
        .unwrap()
}

/// In-memory services whose case repository is `cases`
pub async fn services_with_cases(cases: Arc<dyn CaseRepository>) -> CaseflowServices {
    let repositories = Repositories {
        cases,
        ..Repositories::in_memory()
    };
    let services = CaseflowServices::assemble(repositories, None, WorkflowSettings::default());
    services.users.seed(&users()).await.unwrap();
    services
}

/// Case repository whose next updates fail with queued errors
#[derive(Default)]
pub struct FlakyCaseRepository {
    inner: InMemoryCaseRepository,
    failures: Mutex<VecDeque<RepositoryError>>,
}

impl FlakyCaseRepository {
    pub fn fail_next_update(&self, error: RepositoryError) {
        self.failures.lock().push_back(error);
    }
}

#[async_trait]
impl CaseRepository for FlakyCaseRepository {
    async fn insert(&self, case: &Case) -> Result<(), RepositoryError> {
        self.inner.insert(case).await
    }

    async fn update(&self, case: &Case) -> Result<Case, RepositoryError> {
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        self.inner.update(case).await
    }

    async fn find_by_id(&self, id: CaseId) -> Result<Option<Case>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_number(&self, case_number: &str) -> Result<Option<Case>, RepositoryError> {
        self.inner.find_by_number(case_number).await
    }

    async fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, RepositoryError> {
        self.inner.list(filter).await
    }

    async fn delete(&self, id: CaseId) -> Result<(), RepositoryError> {
        self.inner.delete(id).await
    }

    async fn next_case_sequence(&self, year: i32) -> Result<u32, RepositoryError> {
        self.inner.next_case_sequence(year).await
    }
}

pub fn full_fields() -> CaseFields {
    CaseFields {
        case_type: Some(CaseType::MoneyLaundering),
        priority: Some(Priority::High),
        risk_score: Some(72.5),
        entity: Some("Northwind Trading".to_string()),
        alert_id: Some("ALERT-1042".to_string()),
        typology: Some(Typology::MoneyLaundering),
        description: Some("Repeated cash deposits just under the reporting threshold".to_string()),
    }
}

pub fn draft_fields() -> CaseFields {
    CaseFields {
        description: Some("Unusual wire pattern, details pending".to_string()),
        ..Default::default()
    }
}
