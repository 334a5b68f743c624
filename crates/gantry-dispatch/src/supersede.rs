//! Cancellation of runs replaced by a newer dispatch.

use gantry_store::{RunFilter, RunStorage, StoreError};
use gantry_types::Run;

/// What happened to a new run's predecessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Supersession {
    /// Ids of the runs that were cancelled (possibly none).
    Cancelled(Vec<i64>),
    /// Cancellation failed; the new run stands regardless.
    Failed(String),
}

impl Supersession {
    pub fn cancelled(&self) -> &[i64] {
        match self {
            Self::Cancelled(ids) => ids,
            Self::Failed(_) => &[],
        }
    }
}

/// Cancel every active run sharing `run`'s repository, ref, workflow and
/// event, except `run` itself.
///
/// Must only be called once `run` is committed.
pub fn cancel_previous_runs<S>(store: &S, run: &Run) -> Result<Vec<i64>, StoreError>
where
    S: RunStorage + ?Sized,
{
    let filter = RunFilter::same_workflow(run);
    let mut cancelled = Vec::new();
    for previous in store.find_active_runs(&filter)? {
        if previous.id == run.id {
            continue;
        }
        if store.cancel_run(previous.id)? {
            tracing::info!(
                run_id = previous.id,
                superseded_by = run.id,
                workflow = %run.workflow_id,
                git_ref = %run.ref_name,
                "Cancelled superseded run"
            );
            cancelled.push(previous.id);
        }
    }
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_store::MockRunStorage;
    use gantry_types::Status;

    fn run(ref_name: &str) -> Run {
        Run {
            repo_id: 1,
            workflow_id: "build.yml".into(),
            ref_name: ref_name.into(),
            event: "workflow_dispatch".into(),
            status: Status::Waiting,
            ..Default::default()
        }
    }

    #[test]
    fn test_cancels_only_same_identity_and_not_self() {
        let store = MockRunStorage::new();
        let (old, _) = store.insert_run(run("refs/heads/main"), vec![]).unwrap();
        let (other_ref, _) = store.insert_run(run("refs/heads/dev"), vec![]).unwrap();
        let (new, _) = store.insert_run(run("refs/heads/main"), vec![]).unwrap();

        let cancelled = cancel_previous_runs(&store, &new).unwrap();
        assert_eq!(cancelled, [old.id]);
        assert_eq!(store.get_run(old.id).unwrap().status, Status::Cancelled);
        assert_eq!(store.get_run(new.id).unwrap().status, Status::Waiting);
        assert_eq!(store.get_run(other_ref.id).unwrap().status, Status::Waiting);
    }

    #[test]
    fn test_supersession_accessor() {
        assert_eq!(Supersession::Cancelled(vec![1, 2]).cancelled(), [1, 2]);
        assert!(Supersession::Failed("boom".into()).cancelled().is_empty());
    }
}
