// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Permission Gate
//!
//! Pure mapping of `(role, action)` to allowed/denied. This is the single
//! canonical matrix; nothing else in the crate compares role names.
//!
//! | action | ANALYST | ADMIN |
//! |---|---|---|
//! | CREATE_CASE | yes | yes |
//! | APPROVE_CASE | no | yes |
//! | ASSIGN_TASK | no | yes |
//! | VIEW_ALL_CASES | no | yes |
//! | COMPLETE_TASK | yes | yes |
//! | MANAGE_USERS | no | yes |
//!
//! Action names arriving from outside the crate go through
//! [`authorize_named`], which denies anything it does not recognise.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::CaseflowError;
use crate::domain::user::{Actor, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    CreateCase,
    ApproveCase,
    AssignTask,
    ViewAllCases,
    CompleteTask,
    ManageUsers,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::CreateCase,
        Action::ApproveCase,
        Action::AssignTask,
        Action::ViewAllCases,
        Action::CompleteTask,
        Action::ManageUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateCase => "CREATE_CASE",
            Action::ApproveCase => "APPROVE_CASE",
            Action::AssignTask => "ASSIGN_TASK",
            Action::ViewAllCases => "VIEW_ALL_CASES",
            Action::CompleteTask => "COMPLETE_TASK",
            Action::ManageUsers => "MANAGE_USERS",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

pub fn authorize(role: Role, action: Action) -> bool {
    match (role, action) {
        (Role::Admin, _) => true,
        (Role::Analyst, Action::CreateCase | Action::CompleteTask) => true,
        (
            Role::Analyst,
            Action::ApproveCase | Action::AssignTask | Action::ViewAllCases | Action::ManageUsers,
        ) => false,
    }
}

/// Authorize an action given by name. Unrecognised names are denied.
pub fn authorize_named(role: Role, action: &str) -> bool {
    match action.parse::<Action>() {
        Ok(action) => authorize(role, action),
        Err(_) => false,
    }
}

/// Fail with `PermissionError` unless the actor's role grants `action`
pub fn require(actor: &Actor, action: Action) -> Result<(), CaseflowError> {
    if authorize(actor.role, action) {
        Ok(())
    } else {
        Err(CaseflowError::permission(
            &actor.id,
            format!("role {} does not grant {}", actor.role, action),
        ))
    }
}
