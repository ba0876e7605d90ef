// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use colored::Colorize;

use crate::client::CaseflowClient;

/// Print a case's audit trail, newest first
pub async fn show(client: &CaseflowClient, case_ref: &str) -> Result<()> {
    let entries = client
        .audit(case_ref)
        .await
        .with_context(|| format!("Failed to fetch audit trail for {}", case_ref))?;

    if entries.is_empty() {
        println!("{}", "No audit entries".dimmed());
        return Ok(());
    }
    for entry in entries {
        let change = match (&entry.old_value, &entry.new_value) {
            (Some(old), Some(new)) => format!(" {} → {}", old, new),
            (None, Some(new)) => format!(" → {}", new),
            _ => String::new(),
        };
        println!(
            "{} {:<16} {:<10}{} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            entry.action.to_string().bold(),
            entry.performed_by,
            change,
            entry.details
        );
    }
    Ok(())
}
