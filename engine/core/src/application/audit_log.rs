// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Audit Log service: append and query the per-case trail.

use std::sync::Arc;
use tracing::debug;

use crate::domain::audit::AuditLogEntry;
use crate::domain::case::CaseId;
use crate::domain::error::CaseflowResult;
use crate::domain::repository::AuditLogRepository;

#[derive(Clone)]
pub struct AuditLogService {
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditLogService {
    pub fn new(repository: Arc<dyn AuditLogRepository>) -> Self {
        Self { repository }
    }

    pub async fn record(&self, entry: AuditLogEntry) -> CaseflowResult<AuditLogEntry> {
        self.repository.append(&entry).await?;
        debug!(
            case_id = %entry.case_id,
            action = %entry.action,
            performed_by = %entry.performed_by,
            "Audit entry appended"
        );
        Ok(entry)
    }

    /// Entries for a case, newest first. Callers check case visibility.
    pub async fn for_case(&self, case_id: CaseId) -> CaseflowResult<Vec<AuditLogEntry>> {
        Ok(self.repository.find_by_case(case_id).await?)
    }
}
