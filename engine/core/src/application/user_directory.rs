// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0
//! User Directory: resolves request identities into actors and manages the
//! user list. Adding users requires MANAGE_USERS.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::error::{CaseflowError, CaseflowResult, EntityKind};
use crate::domain::permission::{require, Action};
use crate::domain::repository::{RepositoryError, UserRepository};
use crate::domain::user::{Actor, User, UserId};

#[derive(Clone)]
pub struct UserDirectory {
    repository: Arc<dyn UserRepository>,
}

impl UserDirectory {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    /// Insert configured users, leaving existing ones untouched
    pub async fn seed(&self, users: &[User]) -> CaseflowResult<()> {
        for user in users {
            match self.repository.insert(user).await {
                Ok(()) => info!(user_id = %user.id, role = %user.role, "Seeded user"),
                Err(RepositoryError::Duplicate { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Resolve a raw identity into an actor. Unknown identities are denied.
    pub async fn resolve(&self, raw: &str) -> CaseflowResult<Actor> {
        let id = UserId::parse(raw).map_err(|_| CaseflowError::permission("anonymous", "no user identity supplied"))?;
        match self.repository.find_by_id(&id).await? {
            Some(user) => Ok(user.actor()),
            None => {
                warn!(user_id = %id, "Rejected unknown user");
                Err(CaseflowError::permission(&id, "unknown user"))
            }
        }
    }

    pub async fn get(&self, id: &UserId) -> CaseflowResult<User> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| CaseflowError::not_found(EntityKind::User, id))
    }

    /// Fails with a validation error when the user does not exist
    pub async fn ensure_exists(&self, id: &UserId) -> CaseflowResult<()> {
        match self.repository.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(CaseflowError::validation(format!("unknown user: {}", id))),
        }
    }

    pub async fn list(&self) -> CaseflowResult<Vec<User>> {
        Ok(self.repository.list_all().await?)
    }

    pub async fn create(&self, user: User, actor: &Actor) -> CaseflowResult<User> {
        require(actor, Action::ManageUsers)?;
        if user.display_name.trim().is_empty() {
            return Err(CaseflowError::validation("display name must not be blank"));
        }
        self.repository.insert(&user).await.map_err(|e| match e {
            RepositoryError::Duplicate { entity, id } => CaseflowError::conflict(
                entity,
                id,
                "an unused user id",
                "an existing user",
                "user already exists",
            ),
            other => other.into(),
        })?;
        info!(user_id = %user.id, role = %user.role, created_by = %actor.id, "User created");
        Ok(user)
    }
}
