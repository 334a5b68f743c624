//! Ref resolution.

use gantry_git::{Commit, GitRepository, RefName};

use crate::error::{DispatchError, Result};

/// A ref pinned to the commit it pointed at when resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    pub commit: Commit,
    pub ref_name: RefName,
}

impl ResolvedRef {
    /// Fully-qualified ref recorded on the run.
    pub fn full_name(&self) -> String {
        self.ref_name.full_name()
    }
}

/// Resolve `ref_str` to a commit.
///
/// `refs/tags/*` resolves as a tag, `refs/heads/*` as a branch, and anything
/// else as a branch short name. Failures carry the ref exactly as supplied.
pub fn resolve_ref<R>(repo: &R, ref_str: &str) -> Result<ResolvedRef>
where
    R: GitRepository + ?Sized,
{
    let ref_name = RefName::classify(ref_str);
    let commit = match &ref_name {
        RefName::Tag(tag) => repo.tag_commit(tag),
        RefName::Branch(branch) | RefName::Bare(branch) => repo.branch_commit(branch),
    }
    .map_err(|source| DispatchError::RefNotFound {
        ref_name: ref_str.to_string(),
        source,
    })?;

    tracing::debug!(
        git_ref = ref_str,
        kind = %ref_name.kind(),
        commit = %commit.id,
        "Resolved ref"
    );
    Ok(ResolvedRef { commit, ref_name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use gantry_git::MemoryRepository;

    fn repo() -> MemoryRepository {
        let repo = MemoryRepository::new("main");
        let on_branch = repo.commit("b1", "branch tip", &[]);
        let on_tag = repo.commit("t1", "release", &[]);
        repo.set_branch("main", &on_branch);
        repo.set_branch("v1", &on_branch);
        repo.set_tag("v1", &on_tag);
        repo
    }

    #[test]
    fn test_tag_ref_prefers_tag() {
        let resolved = resolve_ref(&repo(), "refs/tags/v1").unwrap();
        assert_eq!(resolved.commit.id, "t1");
        assert_eq!(resolved.full_name(), "refs/tags/v1");
    }

    #[test]
    fn test_branch_and_bare_refs() {
        let repo = repo();
        let full = resolve_ref(&repo, "refs/heads/main").unwrap();
        let bare = resolve_ref(&repo, "main").unwrap();
        assert_eq!(full.commit, bare.commit);
        assert_eq!(bare.full_name(), "refs/heads/main");

        let bare_v1 = resolve_ref(&repo, "v1").unwrap();
        assert_eq!(bare_v1.commit.id, "b1");
    }

    #[test]
    fn test_missing_ref_keeps_original_string() {
        let err = resolve_ref(&repo(), "refs/tags/v9").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.locale().unwrap().args, ["refs/tags/v9"]);
    }
}
