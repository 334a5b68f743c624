//! Decoding of the `on:` block.

use std::fmt;

use serde_yaml::Value;

use crate::error::{Result, WorkflowError};
use crate::model::scalar_to_string;

const WORKFLOW_DISPATCH: &str = "workflow_dispatch";

/// The events a workflow listens to, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Triggers {
    events: Vec<(String, Value)>,
}

impl Triggers {
    /// Decode `on: event`, `on: [a, b]` or a mapping of event → config.
    pub fn decode(raw_on: &Value) -> Result<Self> {
        let events = match raw_on {
            Value::Null => Vec::new(),
            Value::String(event) => vec![(event.clone(), Value::Null)],
            Value::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(event) => Ok((event.clone(), Value::Null)),
                    other => Err(WorkflowError::Invalid(format!(
                        "trigger list entries must be event names, got {other:?}"
                    ))),
                })
                .collect::<Result<_>>()?,
            Value::Mapping(map) => map
                .iter()
                .map(|(key, config)| match key {
                    Value::String(event) => Ok((event.clone(), config.clone())),
                    other => Err(WorkflowError::Invalid(format!(
                        "trigger names must be strings, got {other:?}"
                    ))),
                })
                .collect::<Result<_>>()?,
            other => {
                return Err(WorkflowError::Invalid(format!(
                    "unsupported 'on' value: {other:?}"
                )));
            }
        };
        Ok(Self { events })
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events().any(|name| name == event)
    }

    /// Raw configuration of one event, if declared.
    pub fn config(&self, event: &str) -> Option<&Value> {
        self.events
            .iter()
            .find(|(name, _)| name == event)
            .map(|(_, config)| config)
    }

    /// The manual-dispatch input schema, or `None` when the workflow
    /// cannot be dispatched manually.
    pub fn workflow_dispatch_config(&self) -> Result<Option<WorkflowDispatch>> {
        let Some(config) = self.config(WORKFLOW_DISPATCH) else {
            return Ok(None);
        };

        let inputs = match config {
            Value::Null => Vec::new(),
            Value::Mapping(map) => match map.get("inputs") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Mapping(inputs)) => inputs
                    .iter()
                    .map(|(name, def)| {
                        let name = scalar_to_string(name).ok_or_else(|| {
                            WorkflowError::Invalid(format!("input name {name:?} is not a scalar"))
                        })?;
                        let def = InputDef::decode(&name, def)?;
                        Ok(DispatchInput { name, def })
                    })
                    .collect::<Result<_>>()?,
                Some(other) => {
                    return Err(WorkflowError::Invalid(format!(
                        "workflow_dispatch inputs must be a mapping, got {other:?}"
                    )));
                }
            },
            other => {
                return Err(WorkflowError::Invalid(format!(
                    "workflow_dispatch config must be a mapping, got {other:?}"
                )));
            }
        };

        Ok(Some(WorkflowDispatch { inputs }))
    }
}

/// `on.workflow_dispatch`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowDispatch {
    /// Declared inputs in declaration order.
    pub inputs: Vec<DispatchInput>,
}

impl WorkflowDispatch {
    pub fn input(&self, name: &str) -> Option<&InputDef> {
        self.inputs
            .iter()
            .find(|input| input.name == name)
            .map(|input| &input.def)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchInput {
    pub name: String,
    pub def: InputDef,
}

/// Declaration of one dispatch input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputDef {
    pub description: String,
    pub required: bool,
    /// Default in text form; scalars of any type are stringified.
    pub default: Option<String>,
    pub input_type: InputType,
    /// Allowed values of a `choice` input.
    pub options: Vec<String>,
}

impl InputDef {
    fn decode(name: &str, raw: &Value) -> Result<Self> {
        let map = match raw {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map,
            other => {
                return Err(WorkflowError::Invalid(format!(
                    "input '{name}' must be a mapping, got {other:?}"
                )));
            }
        };

        let text = |key: &str| map.get(key).and_then(scalar_to_string);

        let required = match map.get("required") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            Some(other) => {
                return Err(WorkflowError::Invalid(format!(
                    "input '{name}': 'required' must be a boolean, got {other:?}"
                )));
            }
        };

        let input_type = match text("type") {
            None => InputType::String,
            Some(t) => t.parse().unwrap_or_else(|_| {
                tracing::warn!(input = name, input_type = %t, "Unknown input type, treating as string");
                InputType::String
            }),
        };

        let options = match map.get("options") {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_to_string).collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            description: text("description").unwrap_or_default(),
            required,
            default: text("default"),
            input_type,
            options,
        })
    }
}

/// `type:` of a dispatch input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputType {
    #[default]
    String,
    Boolean,
    Number,
    Choice,
    Environment,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Choice => "choice",
            Self::Environment => "environment",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InputType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "string" => Ok(Self::String),
            "boolean" => Ok(Self::Boolean),
            "number" => Ok(Self::Number),
            "choice" => Ok(Self::Choice),
            "environment" => Ok(Self::Environment),
            other => Err(WorkflowError::Invalid(format!("unknown input type '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_decode_forms() {
        let single = Triggers::decode(&on("push")).unwrap();
        assert_eq!(single.events().collect::<Vec<_>>(), ["push"]);

        let list = Triggers::decode(&on("[push, workflow_dispatch]")).unwrap();
        assert!(list.contains("workflow_dispatch"));

        let map = Triggers::decode(&on("push:\n  branches: [main]\nschedule:\n  - cron: '0 0 * * *'\n")).unwrap();
        assert_eq!(map.events().collect::<Vec<_>>(), ["push", "schedule"]);
        assert!(map.config("push").unwrap().is_mapping());

        assert_eq!(Triggers::decode(&Value::Null).unwrap().events().count(), 0);
        assert!(Triggers::decode(&on("42")).is_err());
    }

    #[test]
    fn test_no_dispatch_trigger() {
        let triggers = Triggers::decode(&on("[push, pull_request]")).unwrap();
        assert!(triggers.workflow_dispatch_config().unwrap().is_none());
    }

    #[test]
    fn test_dispatch_without_inputs() {
        for raw in ["workflow_dispatch", "workflow_dispatch:", "workflow_dispatch: {}"] {
            let triggers = Triggers::decode(&on(raw)).unwrap();
            let dispatch = triggers.workflow_dispatch_config().unwrap().unwrap();
            assert!(dispatch.inputs.is_empty(), "{raw}");
        }
    }

    #[test]
    fn test_dispatch_inputs_in_order() {
        let raw = on(r#"
workflow_dispatch:
  inputs:
    env:
      description: Target environment
      type: choice
      options: [staging, production]
      default: staging
    dry_run:
      type: boolean
      default: false
    retries:
      type: number
      required: true
      default: 3
    note:
"#);
        let dispatch = Triggers::decode(&raw)
            .unwrap()
            .workflow_dispatch_config()
            .unwrap()
            .unwrap();

        let names: Vec<_> = dispatch.inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["env", "dry_run", "retries", "note"]);

        let env = dispatch.input("env").unwrap();
        assert_eq!(env.input_type, InputType::Choice);
        assert_eq!(env.options, ["staging", "production"]);
        assert_eq!(env.default.as_deref(), Some("staging"));
        assert_eq!(env.description, "Target environment");

        let dry_run = dispatch.input("dry_run").unwrap();
        assert_eq!(dry_run.input_type, InputType::Boolean);
        assert_eq!(dry_run.default.as_deref(), Some("false"));

        let retries = dispatch.input("retries").unwrap();
        assert!(retries.required);
        assert_eq!(retries.default.as_deref(), Some("3"));

        let note = dispatch.input("note").unwrap();
        assert_eq!(note, &InputDef::default());
    }

    #[test]
    fn test_unknown_type_falls_back_to_string() {
        let raw = on("workflow_dispatch:\n  inputs:\n    x:\n      type: fancy\n");
        let dispatch = Triggers::decode(&raw)
            .unwrap()
            .workflow_dispatch_config()
            .unwrap()
            .unwrap();
        assert_eq!(dispatch.input("x").unwrap().input_type, InputType::String);
    }

    #[test]
    fn test_malformed_inputs() {
        let raw = on("workflow_dispatch:\n  inputs: [a, b]\n");
        let triggers = Triggers::decode(&raw).unwrap();
        assert!(triggers.workflow_dispatch_config().is_err());
    }
}
