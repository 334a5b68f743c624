//! API snapshots of repositories and users.

use gantry_types::{AccessMode, ApiRepository, ApiUser, Permission, Repository, User};

/// Snapshot of `user` as seen with `mode` access.
///
/// The email address is only included for callers with at least read
/// access.
pub fn to_api_user(user: &User, mode: AccessMode) -> ApiUser {
    ApiUser {
        id: user.id,
        login: user.login.clone(),
        full_name: user.full_name.clone(),
        email: if mode >= AccessMode::Read {
            user.email.clone()
        } else {
            String::new()
        },
    }
}

/// Snapshot of `repo` with permission flags for `mode`.
pub fn to_api_repo(repo: &Repository, mode: AccessMode) -> ApiRepository {
    let owner = User {
        id: repo.owner_id,
        login: repo.owner_name.clone(),
        ..Default::default()
    };
    ApiRepository {
        id: repo.id,
        owner: to_api_user(&owner, mode),
        name: repo.name.clone(),
        full_name: repo.full_name(),
        description: repo.description.clone(),
        private: repo.is_private,
        default_branch: repo.default_branch.clone(),
        permissions: Permission::from(mode),
    }
}
