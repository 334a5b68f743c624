//! `${{ expression }}` rendering for workflow strings.
//!
//! Only context lookups are supported, which covers `run-name` templates
//! and matrix-dependent job names:
//!
//! - `${{ github.ref_name }}`: field access
//! - `${{ github.event.inputs.env }}`: nested field access via dot notation
//! - `${{ matrix.os[0] }}`: array index access
//!
//! Lookups that fall off the context (unknown keys, missing fields) render
//! as the empty string. So do expressions outside that subset (functions,
//! operators, literals), with a warning.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Result, WorkflowError};

const OPEN: &str = "${{";
const CLOSE: &str = "}}";

/// Resolves `${{ ... }}` templates against a context data map.
pub struct ExpressionResolver<'a> {
    data: &'a HashMap<String, Value>,
}

impl<'a> ExpressionResolver<'a> {
    /// Create a resolver backed by a context data map.
    ///
    /// Keys are top-level context names (`github`, `matrix`, ...).
    pub fn new(data: &'a HashMap<String, Value>) -> Self {
        Self { data }
    }

    /// Render every `${{ ... }}` occurrence in `template` as text.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut remaining = template;

        while let Some(start) = remaining.find(OPEN) {
            let Some(len) = remaining[start..].find(CLOSE) else {
                // Unclosed `${{` is left as literal text.
                break;
            };
            out.push_str(&remaining[..start]);
            let inner = remaining[start + OPEN.len()..start + len].trim();
            match self.resolve_expression(inner) {
                Ok(value) => out.push_str(&value_to_string(&value)),
                Err(e) => tracing::warn!(
                    expression = inner,
                    error = %e,
                    "Cannot evaluate expression, rendering it empty"
                ),
            }
            remaining = &remaining[start + len + CLOSE.len()..];
        }

        out.push_str(remaining);
        out
    }

    /// Resolve a single dot-separated path expression against the context.
    pub fn resolve_expression(&self, path: &str) -> Result<Value> {
        if path.is_empty() {
            return Err(WorkflowError::Expression("empty expression".into()));
        }
        if !is_path_expression(path) {
            return Err(WorkflowError::Expression(format!(
                "unsupported expression '{path}': only context lookups are allowed"
            )));
        }

        let segments = parse_path_segments(path);
        let Some(root) = self.data.get(segments[0].name.as_str()) else {
            return Ok(Value::Null);
        };

        let mut current = root;
        for segment in &segments[1..] {
            match navigate_segment(current, segment) {
                Some(next) => current = next,
                None => return Ok(Value::Null),
            }
        }
        Ok(current.clone())
    }
}

/// Render a template against a context map in one call.
pub fn render_template(template: &str, data: &HashMap<String, Value>) -> String {
    ExpressionResolver::new(data).render(template)
}

/// Whether `s` contains any `${{ ... }}` expression.
pub fn has_expression(s: &str) -> bool {
    s.find(OPEN)
        .is_some_and(|start| s[start..].contains(CLOSE))
}

fn is_path_expression(path: &str) -> bool {
    path.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '[' | ']'))
        && !path.starts_with('.')
        && !path.starts_with('[')
}

// ---------------------------------------------------------------------------
// Path navigation
// ---------------------------------------------------------------------------

/// A segment of a dot-separated path, optionally with an array index.
#[derive(Debug)]
struct PathSegment {
    name: String,
    index: Option<usize>,
}

/// `"matrix.items[0].name"` → `[("matrix", None), ("items", Some(0)), ("name", None)]`
fn parse_path_segments(path: &str) -> Vec<PathSegment> {
    path.split('.')
        .map(|part| {
            if let Some(bracket_start) = part.find('[')
                && let Some(bracket_end) = part.find(']')
                && bracket_end > bracket_start
            {
                return PathSegment {
                    name: part[..bracket_start].to_string(),
                    index: part[bracket_start + 1..bracket_end].parse().ok(),
                };
            }
            PathSegment {
                name: part.to_string(),
                index: None,
            }
        })
        .collect()
}

fn navigate_segment<'a>(value: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    let field = if segment.name.is_empty() {
        value
    } else {
        value.get(&segment.name)?
    };

    match segment.index {
        Some(i) => field.get(i),
        None => Some(field),
    }
}

/// Text form of a value for interpolation. Null renders as nothing.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_context() -> HashMap<String, Value> {
        let mut ctx = HashMap::new();
        ctx.insert(
            "github".to_string(),
            json!({
                "ref": "refs/heads/main",
                "ref_name": "main",
                "run_number": 7,
                "event": {"inputs": {"env": "staging"}},
            }),
        );
        ctx.insert("matrix".to_string(), json!({"os": ["linux", "mac"]}));
        ctx
    }

    #[test]
    fn test_render_field() {
        let ctx = test_context();
        let out = render_template("Build ${{ github.ref_name }}", &ctx);
        assert_eq!(out, "Build main");
    }

    #[test]
    fn test_render_multiple_and_numbers() {
        let ctx = test_context();
        let out = render_template("#${{github.run_number}} on ${{ github.ref }}", &ctx);
        assert_eq!(out, "#7 on refs/heads/main");
    }

    #[test]
    fn test_nested_and_indexed() {
        let ctx = test_context();
        let resolver = ExpressionResolver::new(&ctx);
        assert_eq!(
            resolver
                .resolve_expression("github.event.inputs.env")
                .unwrap(),
            json!("staging")
        );
        assert_eq!(
            resolver.resolve_expression("matrix.os[1]").unwrap(),
            json!("mac")
        );
    }

    #[test]
    fn test_unknown_keys_render_empty() {
        let ctx = test_context();
        let out = render_template("[${{ vars.name }}][${{ github.nope.deeper }}]", &ctx);
        assert_eq!(out, "[][]");
    }

    #[test]
    fn test_unclosed_is_literal() {
        let ctx = test_context();
        let out = render_template("oops ${{ github.ref", &ctx);
        assert_eq!(out, "oops ${{ github.ref");
    }

    #[test]
    fn test_no_templates() {
        let ctx = test_context();
        assert_eq!(render_template("plain", &ctx), "plain");
        assert!(!has_expression("plain"));
        assert!(has_expression("a ${{ b }}"));
    }

    #[test]
    fn test_unsupported_expressions_render_empty() {
        let ctx = test_context();
        assert_eq!(render_template("a${{ }}b", &ctx), "ab");
        assert_eq!(
            render_template("Deploy ${{ format('v{0}', github.ref_name) }}!", &ctx),
            "Deploy !"
        );
        assert_eq!(
            render_template(
                "[${{ github.event_name == 'push' && 'a' || 'b' }}] ${{ github.ref_name }}",
                &ctx
            ),
            "[] main"
        );
    }

    #[test]
    fn test_resolve_rejects_non_lookups() {
        let ctx = test_context();
        let resolver = ExpressionResolver::new(&ctx);
        assert!(resolver.resolve_expression("").is_err());
        let err = resolver
            .resolve_expression("github.ref == 'main'")
            .unwrap_err();
        assert!(err.to_string().contains("unsupported expression"));
    }
}
