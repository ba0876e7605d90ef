// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Case registry flows through the service layer: creation, completion of
//! drafts, abandonment, visibility and deletion.

mod common;

use caseflow_core::domain::audit::AuditAction;
use caseflow_core::domain::case::{CaseFields, CaseFilter, CaseStatus, Priority};
use caseflow_core::domain::task::TaskKind;
use caseflow_core::domain::workflow_runtime::WorkItem;
use caseflow_core::infrastructure::DomainEvent;

use common::{actor, draft_fields, full_fields, services};

#[tokio::test]
async fn test_case_numbers_are_sequential() {
    let services = services().await;
    let first = services.cases.create(draft_fields(), &actor("analyst1")).await.unwrap();
    let second = services.cases.create(draft_fields(), &actor("analyst2")).await.unwrap();

    let year = chrono::Utc::now().format("%Y").to_string();
    assert_eq!(first.case_number, format!("CASE-{}-0001", year));
    assert_eq!(second.case_number, format!("CASE-{}-0002", year));
}

#[tokio::test]
async fn test_fully_classified_case_opens_one_approval_task() {
    let services = services().await;
    let case = services.cases.create(full_fields(), &actor("analyst1")).await.unwrap();
    assert_eq!(case.status, CaseStatus::PendingCaseCreationApproval);

    let pooled = services.tasks.by_group("Supervisors", &actor("admin1")).await.unwrap();
    assert_eq!(pooled.len(), 1);
    match &pooled[0] {
        WorkItem::RegistryNative(task) => {
            assert_eq!(task.kind, TaskKind::ApproveCaseCreation);
            assert_eq!(task.case_id, case.id);
            assert!(task.assignee.is_none());
        }
        other => panic!("unexpected item {:?}", other),
    }

    let audit = services.audit.for_case(case.id).await.unwrap();
    let actions: Vec<_> = audit.iter().map(|e| e.action).collect();
    assert!(actions.contains(&AuditAction::CaseCreated));
    assert!(actions.contains(&AuditAction::TaskCreated));
}

#[tokio::test]
async fn test_draft_then_complete_reaches_pending() {
    let services = services().await;
    let analyst = actor("analyst1");
    let draft = services.cases.create(draft_fields(), &analyst).await.unwrap();
    assert_eq!(draft.status, CaseStatus::Draft);
    assert!(services.tasks.by_case(draft.id, &analyst).await.unwrap().is_empty());

    let completed = services.cases.complete(draft.id, full_fields(), &analyst).await.unwrap();
    assert_eq!(completed.status, CaseStatus::PendingCaseCreationApproval);
    assert_eq!(completed.version, draft.version + 1);

    let tasks = services.tasks.by_case(draft.id, &analyst).await.unwrap();
    assert_eq!(tasks.len(), 1);

    let audit = services.audit.for_case(draft.id).await.unwrap();
    let entry = audit.iter().find(|e| e.action == AuditAction::CaseCompleted).unwrap();
    assert_eq!(entry.old_value.as_deref(), Some("DRAFT"));
    assert_eq!(entry.new_value.as_deref(), Some("PENDING_CASE_CREATION_APPROVAL"));
}

#[tokio::test]
async fn test_incomplete_completion_names_missing_fields() {
    let services = services().await;
    let analyst = actor("analyst1");
    let draft = services.cases.create(draft_fields(), &analyst).await.unwrap();

    let err = services
        .cases
        .complete(
            draft.id,
            CaseFields {
                priority: Some(Priority::Low),
                ..Default::default()
            },
            &analyst,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert!(err.to_string().contains("caseType"));
    assert!(err.to_string().contains("riskScore"));

    let stored = services.cases.get(draft.id, &analyst).await.unwrap();
    assert_eq!(stored, draft);
}

#[tokio::test]
async fn test_complete_outside_draft_conflicts() {
    let services = services().await;
    let analyst = actor("analyst1");
    let case = services.cases.create(full_fields(), &analyst).await.unwrap();
    let err = services.cases.complete(case.id, full_fields(), &analyst).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_missing_description_is_rejected() {
    let services = services().await;
    let fields = CaseFields {
        description: None,
        ..full_fields()
    };
    let err = services.cases.create(fields, &actor("analyst1")).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_abandon_rules_leave_case_unchanged_on_failure() {
    let services = services().await;
    let owner = actor("analyst1");
    let draft = services.cases.create(draft_fields(), &owner).await.unwrap();

    let err = services
        .cases
        .abandon(draft.id, &actor("analyst2"), "not mine")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");

    let err = services.cases.abandon(draft.id, &owner, "").await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(services.cases.get(draft.id, &owner).await.unwrap(), draft);

    let abandoned = services.cases.abandon(draft.id, &owner, "duplicate alert").await.unwrap();
    assert_eq!(abandoned.status, CaseStatus::Abandoned);
    assert_eq!(abandoned.abandon_reason.as_deref(), Some("duplicate alert"));

    let err = services.cases.abandon(draft.id, &owner, "again").await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_abandon_pending_case_conflicts() {
    let services = services().await;
    let owner = actor("analyst1");
    let case = services.cases.create(full_fields(), &owner).await.unwrap();
    let err = services.cases.abandon(case.id, &owner, "mistake").await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_edit_keeps_draft_status() {
    let services = services().await;
    let owner = actor("analyst1");
    let draft = services.cases.create(draft_fields(), &owner).await.unwrap();

    let edited = services
        .cases
        .edit(
            draft.id,
            CaseFields {
                priority: Some(Priority::Critical),
                ..Default::default()
            },
            &owner,
        )
        .await
        .unwrap();
    assert_eq!(edited.status, CaseStatus::Draft);
    assert_eq!(edited.priority, Some(Priority::Critical));

    let err = services
        .cases
        .edit(draft.id, CaseFields::default(), &actor("analyst2"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");
}

#[tokio::test]
async fn test_analysts_only_see_their_own_cases() {
    let services = services().await;
    let mine = services.cases.create(draft_fields(), &actor("analyst1")).await.unwrap();
    let theirs = services.cases.create(draft_fields(), &actor("analyst2")).await.unwrap();

    let visible = services
        .cases
        .list(CaseFilter::default(), &actor("analyst1"))
        .await
        .unwrap();
    assert_eq!(visible.iter().map(|c| c.id).collect::<Vec<_>>(), vec![mine.id]);

    let err = services.cases.get(theirs.id, &actor("analyst1")).await.unwrap_err();
    assert_eq!(err.code(), "PERMISSION_DENIED");

    let all = services.cases.list(CaseFilter::default(), &actor("admin1")).await.unwrap();
    assert_eq!(all.len(), 2);

    let drafts = services
        .cases
        .list(
            CaseFilter {
                status: Some(CaseStatus::PendingCaseCreationApproval),
                ..Default::default()
            },
            &actor("admin1"),
        )
        .await
        .unwrap();
    assert!(drafts.is_empty());
}

#[tokio::test]
async fn test_lookup_by_case_number() {
    let services = services().await;
    let case = services.cases.create(draft_fields(), &actor("analyst1")).await.unwrap();
    let found = services
        .cases
        .find_by_number(&case.case_number, &actor("admin1"))
        .await
        .unwrap();
    assert_eq!(found.id, case.id);

    let err = services
        .cases
        .find_by_number("CASE-1999-9999", &actor("admin1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_only_drafts_without_tasks() {
    let services = services().await;
    let owner = actor("analyst1");
    let draft = services.cases.create(draft_fields(), &owner).await.unwrap();
    let pending = services.cases.create(full_fields(), &owner).await.unwrap();

    let err = services.cases.delete(pending.id, &owner).await.unwrap_err();
    assert!(err.is_conflict());

    services.cases.delete(draft.id, &owner).await.unwrap();
    let err = services.cases.get(draft.id, &owner).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    let audit = services.audit.for_case(draft.id).await.unwrap();
    assert_eq!(audit[0].action, AuditAction::CaseDeleted);
}

#[tokio::test]
async fn test_case_events_are_published() {
    let services = services().await;
    let mut receiver = services.event_bus.subscribe();
    let case = services.cases.create(draft_fields(), &actor("analyst1")).await.unwrap();

    let event = receiver.recv().await.unwrap();
    assert!(matches!(event, DomainEvent::Case(_)));
    assert_eq!(event.case_id(), Some(case.id));
}
