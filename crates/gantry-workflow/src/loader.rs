//! Workflow discovery at a commit.

use gantry_git::{Commit, GitRepository, TreeEntry};

use crate::error::Result;

/// Whether a file name looks like a workflow definition.
pub fn is_workflow_file(name: &str) -> bool {
    name.ends_with(".yml") || name.ends_with(".yaml")
}

/// List workflow files at `commit`.
///
/// `dirs` are tried in order and the first one that exists wins, even if it
/// holds no workflows. Returns the directory used (empty when none exists)
/// and its workflow entries in tree order.
pub fn list_workflows<R, S>(
    repo: &R,
    commit: &Commit,
    dirs: &[S],
) -> Result<(String, Vec<TreeEntry>)>
where
    R: GitRepository + ?Sized,
    S: AsRef<str>,
{
    for dir in dirs {
        let dir = dir.as_ref();
        let entries = match repo.tree_entries(commit, dir) {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => {
                tracing::trace!(dir, commit = %commit.id, "Workflow directory absent");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let workflows = entries
            .into_iter()
            .filter(|entry| entry.is_blob() && is_workflow_file(&entry.name))
            .collect();
        return Ok((dir.to_string(), workflows));
    }
    Ok((String::new(), Vec::new()))
}

/// First entry named exactly `workflow_id`.
pub fn find_workflow<'a>(entries: &'a [TreeEntry], workflow_id: &str) -> Option<&'a TreeEntry> {
    entries.iter().find(|entry| entry.name == workflow_id)
}

/// Raw content of a workflow entry.
pub fn content_from_entry<R>(repo: &R, entry: &TreeEntry) -> Result<Vec<u8>>
where
    R: GitRepository + ?Sized,
{
    Ok(repo.read_blob(entry)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_git::MemoryRepository;

    const DIRS: &[&str] = &[".gitea/workflows", ".github/workflows"];

    #[test]
    fn test_is_workflow_file() {
        assert!(is_workflow_file("build.yml"));
        assert!(is_workflow_file("build.yaml"));
        assert!(!is_workflow_file("README.md"));
        assert!(!is_workflow_file("build.yml.bak"));
    }

    #[test]
    fn test_prefers_first_directory() {
        let repo = MemoryRepository::new("main");
        let commit = repo.commit(
            "c1",
            "init",
            &[
                (".gitea/workflows/a.yml", "on: push"),
                (".gitea/workflows/notes.txt", "x"),
                (".github/workflows/b.yml", "on: push"),
            ],
        );

        let (dir, entries) = list_workflows(&repo, &commit, DIRS).unwrap();
        assert_eq!(dir, ".gitea/workflows");
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.yml"]);
    }

    #[test]
    fn test_falls_back_to_second_directory() {
        let repo = MemoryRepository::new("main");
        let commit = repo.commit(
            "c1",
            "init",
            &[
                (".github/workflows/b.yaml", "on: push"),
                (".github/workflows/a.yml", "on: push"),
            ],
        );

        let (dir, entries) = list_workflows(&repo, &commit, DIRS).unwrap();
        assert_eq!(dir, ".github/workflows");
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.yml", "b.yaml"]);
    }

    #[test]
    fn test_no_directory() {
        let repo = MemoryRepository::new("main");
        let commit = repo.commit("c1", "init", &[("README.md", "hi")]);
        let (dir, entries) = list_workflows(&repo, &commit, DIRS).unwrap();
        assert!(dir.is_empty());
        assert!(entries.is_empty());
    }

    #[test]
    fn test_find_and_read() {
        let repo = MemoryRepository::new("main");
        let commit = repo.commit("c1", "init", &[(".gitea/workflows/build.yml", "on: push\n")]);
        let (_, entries) = list_workflows(&repo, &commit, DIRS).unwrap();

        assert!(find_workflow(&entries, "Build.yml").is_none());
        let entry = find_workflow(&entries, "build.yml").unwrap();
        assert_eq!(content_from_entry(&repo, entry).unwrap(), b"on: push\n");
    }
}
