//! External collaborator contracts: identity lookup and project membership.
//!
//! The engine validates every reservation and proposal against these two
//! interfaces before touching the store. Production deployments back them
//! with the platform's user service; the `Static*` implementations cover
//! embedded use and tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scheduling::types::Role;

/// Directory record for a platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Platform-wide user identifier.
    pub id: String,
    /// Name shown in meeting titles and notifications.
    pub display_name: String,
    /// Contact address, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Canonical role.
    pub role: Role,
}

impl UserProfile {
    /// Create a profile.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: None,
            role,
        }
    }

    /// Set the contact address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Resolves user identifiers to profiles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by identifier.
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>>;
}

/// Answers whether a user is linked to a thesis project.
#[async_trait]
pub trait ProjectRoster: Send + Sync {
    /// Whether the user is a member of the project.
    async fn is_member(&self, project_id: &str, user_id: &str) -> Result<bool>;
}

/// Fixed in-memory user directory.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    users: HashMap<String, UserProfile>,
}

impl StaticDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user.
    pub fn with_user(mut self, profile: UserProfile) -> Self {
        self.users.insert(profile.id.clone(), profile);
        self
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.users.get(user_id).cloned())
    }
}

/// Fixed in-memory project roster.
#[derive(Debug, Default)]
pub struct StaticRoster {
    members: HashMap<String, HashSet<String>>,
}

impl StaticRoster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a user to a project.
    pub fn with_member(
        mut self,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        self.members
            .entry(project_id.into())
            .or_default()
            .insert(user_id.into());
        self
    }
}

#[async_trait]
impl ProjectRoster for StaticRoster {
    async fn is_member(&self, project_id: &str, user_id: &str) -> Result<bool> {
        Ok(self
            .members
            .get(project_id)
            .is_some_and(|members| members.contains(user_id)))
    }
}
