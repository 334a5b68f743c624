//! Repository and user identities, plus their API snapshots.

use serde::{Deserialize, Serialize};

/// A repository that owns workflows and runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub owner_id: i64,
    pub owner_name: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub default_branch: String,
    #[serde(default)]
    pub is_private: bool,
}

impl Repository {
    /// `owner/name`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner_name, self.name)
    }
}

/// A user who triggers dispatches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

/// Access level a snapshot is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    None,
    Read,
    Write,
    Admin,
    Owner,
}

/// Permission flags embedded in a repository snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub admin: bool,
    pub push: bool,
    pub pull: bool,
}

impl From<AccessMode> for Permission {
    fn from(mode: AccessMode) -> Self {
        Self {
            admin: mode >= AccessMode::Admin,
            push: mode >= AccessMode::Write,
            pull: mode >= AccessMode::Read,
        }
    }
}

/// User as embedded in event payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUser {
    pub id: i64,
    pub login: String,
    pub full_name: String,
    /// Empty unless the snapshot was rendered with read access or better.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// Repository as embedded in event payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRepository {
    pub id: i64,
    pub owner: ApiUser,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub private: bool,
    pub default_branch: String,
    pub permissions: Permission,
}
