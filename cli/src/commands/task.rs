// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Task commands
//!
//! Commands: mine, group, claim, decide

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;

use caseflow_core::domain::workflow_runtime::WorkItem;

use super::paint_status;
use crate::client::CaseflowClient;

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Tasks assigned to the acting user
    Mine,

    /// Unassigned tasks offered to a candidate group
    Group {
        #[arg(value_name = "GROUP")]
        group: String,
    },

    /// Take ownership of a task
    Claim {
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },

    /// Approve or reject a case awaiting creation approval
    Decide {
        #[arg(value_name = "TASK_ID")]
        task_id: String,

        #[arg(long)]
        case_id: String,

        /// Reject instead of approve
        #[arg(long)]
        reject: bool,

        #[arg(short, long, default_value = "")]
        comments: String,

        /// Claim the task first if nobody holds it
        #[arg(long)]
        claim: bool,
    },
}

pub async fn handle_command(command: TaskCommand, client: &CaseflowClient, user: &str) -> Result<()> {
    match command {
        TaskCommand::Mine => {
            let tasks = client
                .tasks_for_assignee(user)
                .await
                .context("Failed to list assigned tasks")?;
            print_tasks(&tasks);
            Ok(())
        }
        TaskCommand::Group { group } => {
            let tasks = client
                .tasks_for_group(&group)
                .await
                .with_context(|| format!("Failed to list tasks for group {}", group))?;
            print_tasks(&tasks);
            Ok(())
        }
        TaskCommand::Claim { task_id } => {
            let task = client.claim_task(&task_id).await.context("Failed to claim task")?;
            println!("{}", format!("✓ Task {} claimed", task.id()).green());
            Ok(())
        }
        TaskCommand::Decide {
            task_id,
            case_id,
            reject,
            comments,
            claim,
        } => {
            let response = client
                .decide(&task_id, &case_id, !reject, &comments, claim)
                .await
                .context("Failed to record decision")?;
            print_decision(&response);
            Ok(())
        }
    }
}

fn print_tasks(tasks: &[WorkItem]) {
    if tasks.is_empty() {
        println!("{}", "No tasks".dimmed());
        return;
    }
    for item in tasks {
        match item {
            WorkItem::RegistryNative(task) => println!(
                "{} {} {} [{}] {}",
                task.id.to_string().dimmed(),
                paint_status(task.status.as_str()),
                task.kind.as_str().bold(),
                task.priority.as_str(),
                task.title
            ),
            WorkItem::ExternalWorkflow(task) => println!(
                "{} {} {} {}",
                task.id.to_string().dimmed(),
                paint_status(task.status().as_str()),
                "EXTERNAL".cyan(),
                task.name
            ),
        }
    }
}

fn print_decision(response: &Value) {
    match response["outcome"].as_str() {
        Some("CLAIM_REQUIRED") => {
            let holder = response["currentAssignee"].as_str().unwrap_or("nobody");
            println!(
                "{}",
                format!("Task is held by {}; re-run with --claim to take it over if it is free", holder).yellow()
            );
        }
        Some("DECIDED") => {
            let case = &response["case"];
            println!(
                "{} {} is now {}",
                "✓".green(),
                case["caseNumber"].as_str().unwrap_or("case"),
                paint_status(case["status"].as_str().unwrap_or("?"))
            );
            if let Some(follow_on) = response["followOnTask"]["id"].as_str() {
                println!("  Follow-on task: {}", follow_on);
            }
            if let Some(process) = response["externalProcessRef"].as_str() {
                println!("  External process: {}", process);
            }
        }
        _ => println!("{}", response),
    }
}
