//! Dispatch input processing.

use std::collections::BTreeMap;

use gantry_workflow::{InputDef, InputType, WorkflowDispatch};
use serde_json::{Map, Value};

use crate::error::{DispatchError, Result};

/// Fills dispatch input values from a workflow's declared inputs.
pub trait InputProcessor: Send + Sync {
    /// Populate `inputs` for every input `schema` declares, or fail.
    fn process(&self, schema: &WorkflowDispatch, inputs: &mut Map<String, Value>) -> Result<()>;
}

/// Input values supplied by the caller as text, keyed by input name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppliedInputs {
    values: BTreeMap<String, String>,
}

impl SuppliedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `name=value` pairs. The value may itself contain `=`.
    pub fn parse_pairs<I, S>(pairs: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inputs = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected name=value, got {pair:?}"))?;
            if name.is_empty() {
                return Err(format!("missing input name in {pair:?}"));
            }
            inputs.insert(name, value);
        }
        Ok(inputs)
    }
}

impl InputProcessor for SuppliedInputs {
    fn process(&self, schema: &WorkflowDispatch, inputs: &mut Map<String, Value>) -> Result<()> {
        for input in &schema.inputs {
            let supplied = self.get(&input.name).filter(|v| !v.is_empty());
            let value = input_value(&input.name, &input.def, supplied)?;
            inputs.insert(input.name.clone(), value);
        }

        for name in self.values.keys() {
            if schema.input(name).is_none() {
                tracing::debug!(input = %name, "Ignoring undeclared input");
            }
        }
        Ok(())
    }
}

fn input_value(name: &str, def: &InputDef, supplied: Option<&str>) -> Result<Value> {
    let invalid = |reason: String| DispatchError::InvalidInput {
        name: name.to_string(),
        reason,
    };

    let raw = match supplied.or(def.default.as_deref()) {
        Some(raw) => raw,
        None if def.input_type == InputType::Boolean => "false",
        None if def.required => return Err(invalid("input is required".into())),
        None => "",
    };

    match def.input_type {
        InputType::Boolean => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(invalid(format!("expected true or false, got {other:?}"))),
        },
        InputType::Number if raw.is_empty() => Ok(Value::String(String::new())),
        InputType::Number => serde_json::from_str::<serde_json::Number>(raw.trim())
            .map(Value::Number)
            .map_err(|_| invalid(format!("expected a number, got {raw:?}"))),
        InputType::Choice
            if !raw.is_empty()
                && !def.options.is_empty()
                && !def.options.iter().any(|o| o == raw) =>
        {
            Err(invalid(format!(
                "{raw:?} is not one of {}",
                def.options.join(", ")
            )))
        }
        InputType::String | InputType::Choice | InputType::Environment => {
            Ok(Value::String(raw.to_string()))
        }
    }
}
