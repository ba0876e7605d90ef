// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Adapters for the external workflow runtime port
//! (`crate::domain::workflow_runtime::WorkflowRuntime`).
//!
//! - **HttpWorkflowRuntime** - Flowable-style REST API over `reqwest`
//! - **InMemoryWorkflowRuntime** - process/task simulation for development and tests

pub mod http;
pub mod in_memory;

pub use http::HttpWorkflowRuntime;
pub use in_memory::InMemoryWorkflowRuntime;
