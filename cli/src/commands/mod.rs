// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Caseflow CLI

pub mod audit;
pub mod case;
pub mod config;
pub mod task;

pub use self::case::CaseCommand;
pub use self::config::ConfigCommand;
pub use self::task::TaskCommand;

use colored::{ColoredString, Colorize};

/// Status labels colored by how far along the lifecycle they are
pub(crate) fn paint_status(status: &str) -> ColoredString {
    match status {
        "DRAFT" | "OPEN" => status.normal(),
        "PENDING_CASE_CREATION_APPROVAL" | "CLAIMED" => status.yellow(),
        "READY_FOR_ASSIGNMENT" | "COMPLETED" => status.green(),
        "REJECTED" | "ABANDONED" => status.red(),
        other => other.normal(),
    }
}
