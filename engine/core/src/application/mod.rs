// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Application Layer
//!
//! Use cases that orchestrate the domain aggregates, repositories, the event
//! bus and the external workflow runtime. Every operation takes the acting
//! user explicitly; nothing is read from ambient state.

pub mod approval_coordinator;
pub mod audit_log;
pub mod case_registry;
pub mod repository_factory;
pub mod services;
pub mod task_store;
pub mod user_directory;

pub use approval_coordinator::{
    ApprovalCoordinator, DecisionOutcome, DecisionReceipt, DecisionRequest, StandardApprovalCoordinator,
};
pub use audit_log::AuditLogService;
pub use case_registry::{CaseRegistry, StandardCaseRegistry};
pub use services::CaseflowServices;
pub use task_store::{CreateTaskRequest, StandardTaskStore, TaskStore};
pub use user_directory::UserDirectory;

use crate::domain::config::WorkflowConfig;

/// Workflow parameters shared by the case registry, task store and
/// approval coordinator
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub approval_group: String,
    pub investigation_group: String,
    pub case_number_prefix: String,
    pub process_definition_key: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from(&WorkflowConfig::default())
    }
}

impl From<&WorkflowConfig> for WorkflowSettings {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            approval_group: config.approval_group.clone(),
            investigation_group: config.investigation_group.clone(),
            case_number_prefix: config.case_number_prefix.clone(),
            process_definition_key: config.process_definition_key.clone(),
        }
    }
}
