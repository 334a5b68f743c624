//! The `github.*` expression context.

use std::collections::HashMap;

use gantry_types::{Repository, Run};
use serde::Serialize;
use serde_json::Value;

/// Values exposed to `${{ github.* }}` expressions while parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GitContext {
    pub actor: String,
    pub api_url: String,
    pub event: Value,
    pub event_name: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub ref_name: String,
    pub ref_type: String,
    pub repository: String,
    pub repository_owner: String,
    pub repository_url: String,
    pub run_id: String,
    pub run_number: String,
    pub run_attempt: String,
    pub server_url: String,
    pub sha: String,
    pub workflow: String,
}

impl GitContext {
    /// Context for a run that has been built but not yet persisted.
    ///
    /// Ids and numbers are `0` until the store assigns them. The event is
    /// an empty object while the run carries no payload yet.
    pub fn for_run(run: &Run, repo: &Repository, actor: &str, server_url: &str) -> Self {
        let server_url = server_url.trim_end_matches('/').to_string();
        let ref_type = if run.ref_name.starts_with("refs/tags/") {
            "tag"
        } else if run.ref_name.starts_with("refs/heads/") {
            "branch"
        } else {
            ""
        };
        let event = if run.event_payload.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&run.event_payload)
                .unwrap_or_else(|_| Value::Object(Default::default()))
        };

        Self {
            actor: actor.to_string(),
            api_url: format!("{server_url}/api/v1"),
            event,
            event_name: run.event.clone(),
            git_ref: run.ref_name.clone(),
            ref_name: run.ref_short_name().to_string(),
            ref_type: ref_type.to_string(),
            repository: repo.full_name(),
            repository_owner: repo.owner_name.clone(),
            repository_url: format!("{server_url}/{}", repo.full_name()),
            run_id: run.id.to_string(),
            run_number: run.index.to_string(),
            run_attempt: "1".to_string(),
            sha: run.commit_sha.clone(),
            server_url,
            workflow: run.workflow_id.clone(),
        }
    }

    /// The context as a JSON object.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Expression data with this context under `github`.
    pub fn expression_data(&self) -> HashMap<String, Value> {
        let mut data = HashMap::new();
        data.insert("github".to_string(), self.to_value());
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Run, Repository) {
        let run = Run {
            workflow_id: "build.yml".into(),
            ref_name: "refs/tags/v1.0".into(),
            commit_sha: "abc123".into(),
            event: "workflow_dispatch".into(),
            ..Default::default()
        };
        let repo = Repository {
            owner_name: "acme".into(),
            name: "widgets".into(),
            ..Default::default()
        };
        (run, repo)
    }

    #[test]
    fn test_for_run() {
        let (run, repo) = sample();
        let ctx = GitContext::for_run(&run, &repo, "alice", "https://git.example.com/");

        assert_eq!(ctx.git_ref, "refs/tags/v1.0");
        assert_eq!(ctx.ref_name, "v1.0");
        assert_eq!(ctx.ref_type, "tag");
        assert_eq!(ctx.repository, "acme/widgets");
        assert_eq!(ctx.repository_url, "https://git.example.com/acme/widgets");
        assert_eq!(ctx.api_url, "https://git.example.com/api/v1");
        assert_eq!(ctx.event, serde_json::json!({}));
    }

    #[test]
    fn test_expression_data_uses_ref_key() {
        let (run, repo) = sample();
        let data = GitContext::for_run(&run, &repo, "alice", "").expression_data();
        let github = &data["github"];
        assert_eq!(github["ref"], "refs/tags/v1.0");
        assert_eq!(github["event_name"], "workflow_dispatch");
        assert_eq!(github["sha"], "abc123");
    }
}
