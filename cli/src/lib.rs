// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Caseflow CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Server bootstrap, configuration commands and the HTTP client behind the case/task/audit commands

pub mod client;
pub mod commands;
pub mod server;
