// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Aggregates, value objects and ports. Nothing in here touches storage or
//! the network directly.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`case`] | `Case` aggregate and its status state machine |
//! | [`task`] | registry-native `Task` aggregate, claim and completion rules |
//! | [`workflow_runtime`] | `ExternalTask`, `WorkItem` union and the external runtime port |
//! | [`permission`] | the role/action permission gate |
//! | [`audit`] | append-only `AuditLogEntry` |
//! | [`user`] | `User`, `Role`, `Actor` |
//! | [`events`] | domain events published on the event bus |
//! | [`repository`] | persistence traits, one per aggregate |
//! | [`config`] | `CaseflowConfig` manifest |
//! | [`error`] | `CaseflowError` taxonomy |

pub mod audit;
pub mod case;
pub mod config;
pub mod error;
pub mod events;
pub mod permission;
pub mod repository;
pub mod task;
pub mod user;
pub mod workflow_runtime;
