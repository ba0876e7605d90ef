// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Case commands
//!
//! Commands: list, get, create, abandon

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use caseflow_core::domain::case::{Case, CaseFields, CaseType, Priority, Typology};

use super::paint_status;
use crate::client::{CaseQuery, CaseflowClient};

#[derive(Subcommand)]
pub enum CaseCommand {
    /// List visible cases
    List {
        /// Only cases in this status (e.g. DRAFT)
        #[arg(long)]
        status: Option<String>,

        /// Only cases created by this user
        #[arg(long)]
        created_by: Option<String>,

        #[arg(long)]
        case_type: Option<String>,

        #[arg(long)]
        priority: Option<String>,
    },

    /// Show one case by id or case number
    Get {
        #[arg(value_name = "CASE")]
        case: String,
    },

    /// Open a case; it goes straight to approval when fully classified
    Create(CreateCaseArgs),

    /// Abandon a draft case you created
    Abandon {
        #[arg(value_name = "CASE_ID")]
        case_id: String,

        #[arg(short, long)]
        reason: String,
    },
}

#[derive(Args)]
pub struct CreateCaseArgs {
    #[arg(short, long)]
    pub description: String,

    #[arg(long)]
    pub case_type: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    /// 0 to 100
    #[arg(long)]
    pub risk_score: Option<f64>,

    #[arg(long)]
    pub entity: Option<String>,

    #[arg(long)]
    pub alert_id: Option<String>,

    #[arg(long)]
    pub typology: Option<String>,
}

impl CreateCaseArgs {
    pub fn into_fields(self) -> Result<CaseFields> {
        Ok(CaseFields {
            case_type: self.case_type.map(|t| t.to_ascii_uppercase().parse::<CaseType>()).transpose()?,
            priority: self.priority.map(|p| p.to_ascii_uppercase().parse::<Priority>()).transpose()?,
            risk_score: self.risk_score,
            entity: self.entity,
            alert_id: self.alert_id,
            typology: self.typology.map(|t| t.to_ascii_uppercase().parse::<Typology>()).transpose()?,
            description: Some(self.description),
        })
    }
}

pub async fn handle_command(command: CaseCommand, client: &CaseflowClient) -> Result<()> {
    match command {
        CaseCommand::List {
            status,
            created_by,
            case_type,
            priority,
        } => {
            let query = CaseQuery {
                status,
                created_by,
                case_type,
                priority,
            };
            let cases = client.list_cases(&query).await.context("Failed to list cases")?;
            print_case_table(&cases);
            Ok(())
        }
        CaseCommand::Get { case } => {
            let case = client.get_case(&case).await.context("Failed to fetch case")?;
            print_case(&case);
            Ok(())
        }
        CaseCommand::Create(args) => {
            let fields = args.into_fields()?;
            let case = client.create_case(&fields).await.context("Failed to create case")?;
            println!("{}", format!("✓ Case {} created", case.case_number).green());
            print_case(&case);
            Ok(())
        }
        CaseCommand::Abandon { case_id, reason } => {
            let case = client
                .abandon_case(&case_id, &reason)
                .await
                .context("Failed to abandon case")?;
            println!("{}", format!("✓ Case {} abandoned", case.case_number).green());
            Ok(())
        }
    }
}

fn print_case_table(cases: &[Case]) {
    if cases.is_empty() {
        println!("{}", "No cases found".dimmed());
        return;
    }
    println!(
        "{:<16} {:<32} {:<10} {:<12} {}",
        "NUMBER".bold(),
        "STATUS".bold(),
        "PRIORITY".bold(),
        "CREATED BY".bold(),
        "ID".bold()
    );
    for case in cases {
        println!(
            "{:<16} {:<32} {:<10} {:<12} {}",
            case.case_number,
            paint_status(case.status.as_str()),
            case.priority.map(|p| p.as_str()).unwrap_or("-"),
            case.created_by,
            case.id.to_string().dimmed()
        );
    }
}

fn print_case(case: &Case) {
    println!("{} {}", case.case_number.bold(), paint_status(case.status.as_str()));
    println!("  ID: {}", case.id);
    println!("  Type: {}", case.case_type.map(|t| t.as_str()).unwrap_or("-"));
    println!("  Priority: {}", case.priority.map(|p| p.as_str()).unwrap_or("-"));
    match case.risk_score {
        Some(score) => println!("  Risk score: {:.1}", score),
        None => println!("  Risk score: -"),
    }
    if let Some(entity) = &case.entity {
        println!("  Entity: {}", entity);
    }
    if let Some(typology) = case.typology {
        println!("  Typology: {}", typology.as_str());
    }
    println!("  Created by: {} at {}", case.created_by, case.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(assignee) = &case.assignee {
        println!("  Assignee: {}", assignee);
    }
    if let Some(reason) = &case.abandon_reason {
        println!("  Abandoned: {}", reason);
    }
    println!("  {}", case.description);
}
