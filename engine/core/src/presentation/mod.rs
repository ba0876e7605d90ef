// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! HTTP surface over the application services.

pub mod api;

pub use api::{app, ApiError, AppState, USER_HEADER};
