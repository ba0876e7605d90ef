// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use caseflow_core::domain::config::{CaseflowConfig, ExternalRuntimeConfig};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file with the built-in defaults
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./caseflow-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, force } => generate(&output, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = CaseflowConfig::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. CASEFLOW_CONFIG_PATH: {}",
            std::env::var("CASEFLOW_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./caseflow-config.yaml");
        println!("  4. ~/.caseflow/config.yaml");
        println!("  5. /etc/caseflow/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!("  Listen: {}", config.bind_addr());
    println!("  Storage: {:?}", config.spec.storage.backend);
    println!();

    let workflow = &config.spec.workflow;
    println!("{}", "Workflow:".bold());
    println!("  Approval group: {}", workflow.approval_group);
    println!("  Investigation group: {}", workflow.investigation_group);
    println!("  Case numbers: {}-<year>-<NNNN>", workflow.case_number_prefix);
    match &workflow.external_runtime {
        ExternalRuntimeConfig::Disabled => println!("  External runtime: {}", "disabled".dimmed()),
        ExternalRuntimeConfig::InMemory => println!("  External runtime: in-memory"),
        ExternalRuntimeConfig::Http { base_url, .. } => println!("  External runtime: {}", base_url),
    }
    println!();

    println!("{}", "Users:".bold());
    for user in &config.spec.users {
        println!("  {} ({}) {}", user.id.bold(), user.role, user.display_name.dimmed());
    }
    println!();

    let observability = &config.spec.observability;
    println!("{}", "Observability:".bold());
    println!("  Log level: {}", observability.log_level);
    println!("  Log format: {}", observability.log_format);
    match observability.metrics_port {
        Some(port) => println!("  Metrics port: {}", port),
        None => println!("  Metrics port: {}", "(disabled)".dimmed()),
    }

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = CaseflowConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

pub(crate) fn generate(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists; pass --force to overwrite", output.display());
    }

    CaseflowConfig::default()
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_config_loads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caseflow-config.yaml");

        generate(&path, false).unwrap();
        let config = CaseflowConfig::from_yaml_file(&path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.spec.workflow.approval_group, "Supervisors");
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caseflow-config.yaml");
        std::fs::write(&path, "keep me").unwrap();

        assert!(generate(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");

        generate(&path, true).unwrap();
        assert!(CaseflowConfig::from_yaml_file(&path).is_ok());
    }
}
