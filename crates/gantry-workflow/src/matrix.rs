//! `strategy.matrix` expansion.

use std::collections::HashMap;

use serde_yaml::{Mapping, Value};

use crate::error::{Result, WorkflowError};
use crate::expression::{has_expression, render_template};
use crate::model::{Job, scalar_to_string};

/// One matrix combination, keys in declaration order.
pub type Combination = Vec<(String, Value)>;

/// Expand a job into one job per matrix combination.
///
/// A job without a matrix (or with an empty one) comes back unchanged. Each
/// expanded job carries a single-valued matrix so runners see exactly the
/// combination they were created for.
pub fn expand(
    job_id: &str,
    job: &Job,
    data: &HashMap<String, serde_json::Value>,
) -> Result<Vec<Job>> {
    let Some(matrix) = job.strategy.as_ref().and_then(|s| s.matrix.as_ref()) else {
        return Ok(vec![job.clone()]);
    };

    let combinations = combinations(job_id, matrix)?;
    if combinations.iter().all(Vec::is_empty) {
        return Ok(vec![job.clone()]);
    }

    let base_name = job.name.clone().unwrap_or_else(|| job_id.to_string());
    combinations
        .into_iter()
        .map(|combination| {
            let mut expanded = job.clone();
            expanded.name = Some(name_with_matrix(job_id, &base_name, &combination, data)?);
            if let Some(strategy) = expanded.strategy.as_mut() {
                strategy.matrix = Some(Value::Mapping(
                    combination
                        .into_iter()
                        .map(|(key, value)| (Value::String(key), Value::Sequence(vec![value])))
                        .collect(),
                ));
            }
            Ok(expanded)
        })
        .collect()
}

/// All combinations of a matrix definition.
///
/// List-valued keys are multiplied out with the last key varying fastest,
/// `exclude` entries drop every combination they match, and `include`
/// entries either extend the combinations they match or are appended.
///
/// A matrix that is itself a string, or has a string where a list belongs,
/// is computed at run time (`${{ fromJSON(...) }}`). It yields a single
/// empty combination so the job is kept unexpanded.
pub fn combinations(job_id: &str, matrix: &Value) -> Result<Vec<Combination>> {
    let invalid = |reason: String| WorkflowError::Matrix {
        job: job_id.to_string(),
        reason,
    };
    let unexpanded = |key: &str| -> Result<Vec<Combination>> {
        tracing::warn!(job = job_id, key, "Matrix is not static, job is not expanded");
        Ok(vec![Vec::new()])
    };

    let map = match matrix {
        Value::Mapping(map) => map,
        Value::Null => return Ok(vec![Vec::new()]),
        Value::String(_) => return unexpanded("matrix"),
        other => return Err(invalid(format!("matrix must be a mapping, got {other:?}"))),
    };
    if let Some((key, _)) = map.iter().find(|(_, value)| value.is_string()) {
        return unexpanded(key.as_str().unwrap_or_default());
    }

    let mut dimensions: Vec<(String, Vec<Value>)> = Vec::new();
    let mut include = Vec::new();
    let mut exclude = Vec::new();

    for (key, value) in map {
        let key = key
            .as_str()
            .ok_or_else(|| invalid(format!("matrix key {key:?} is not a string")))?;
        match key {
            "include" => include = entries(value).map_err(|r| invalid(format!("include: {r}")))?,
            "exclude" => exclude = entries(value).map_err(|r| invalid(format!("exclude: {r}")))?,
            _ => match value {
                Value::Sequence(values) if values.is_empty() => {
                    return Err(invalid(format!("'{key}' has no values")));
                }
                Value::Sequence(values) => dimensions.push((key.to_string(), values.clone())),
                other => {
                    return Err(invalid(format!("'{key}' must be a list, got {other:?}")));
                }
            },
        }
    }

    if dimensions.is_empty() && include.is_empty() {
        return Ok(vec![Vec::new()]);
    }

    let mut product: Vec<Combination> = vec![Vec::new()];
    for (key, values) in &dimensions {
        product = product
            .into_iter()
            .flat_map(|combination| {
                values.iter().map(move |value| {
                    let mut next = combination.clone();
                    next.push((key.clone(), value.clone()));
                    next
                })
            })
            .collect();
    }

    product.retain(|combination| !exclude.iter().any(|entry| matches(combination, entry)));
    if dimensions.is_empty() {
        product.clear();
    }

    let base_len = product.len();
    for entry in &include {
        let mut applied = false;
        for combination in product[..base_len].iter_mut() {
            let original_matches = entry.iter().all(|(key, value)| {
                !dimensions.iter().any(|(dim, _)| dim == key)
                    || lookup(combination, key) == Some(value)
            });
            if original_matches {
                for (key, value) in entry {
                    if !dimensions.iter().any(|(dim, _)| dim == key) {
                        set(combination, key, value);
                    }
                }
                applied = true;
            }
        }
        if !applied {
            product.push(entry.clone());
        }
    }

    if product.is_empty() {
        return Err(invalid("matrix produces no combinations".into()));
    }
    Ok(product)
}

fn entries(value: &Value) -> std::result::Result<Vec<Combination>, String> {
    let Value::Sequence(items) = value else {
        return Err(format!("expected a list of mappings, got {value:?}"));
    };
    items
        .iter()
        .map(|item| match item {
            Value::Mapping(map) => mapping_entries(map),
            other => Err(format!("expected a mapping, got {other:?}")),
        })
        .collect()
}

fn mapping_entries(map: &Mapping) -> std::result::Result<Combination, String> {
    map.iter()
        .map(|(key, value)| {
            key.as_str()
                .map(|key| (key.to_string(), value.clone()))
                .ok_or_else(|| format!("key {key:?} is not a string"))
        })
        .collect()
}

fn matches(combination: &Combination, entry: &Combination) -> bool {
    entry
        .iter()
        .all(|(key, value)| lookup(combination, key) == Some(value))
}

fn lookup<'a>(combination: &'a Combination, key: &str) -> Option<&'a Value> {
    combination.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

fn set(combination: &mut Combination, key: &str, value: &Value) {
    match combination.iter_mut().find(|(k, _)| k == key) {
        Some((_, existing)) => *existing = value.clone(),
        None => combination.push((key.to_string(), value.clone())),
    }
}

/// Display name of an expanded job.
///
/// Names containing an expression are rendered with the combination under
/// `matrix`; any other name gets a ` (v1, v2)` suffix.
fn name_with_matrix(
    job_id: &str,
    name: &str,
    combination: &Combination,
    data: &HashMap<String, serde_json::Value>,
) -> Result<String> {
    if combination.is_empty() {
        return Ok(name.to_string());
    }

    if has_expression(name) {
        let matrix: serde_json::Map<String, serde_json::Value> = combination
            .iter()
            .map(|(key, value)| {
                let value = serde_json::to_value(value).map_err(|e| WorkflowError::Matrix {
                    job: job_id.to_string(),
                    reason: e.to_string(),
                })?;
                Ok((key.clone(), value))
            })
            .collect::<Result<_>>()?;
        let mut data = data.clone();
        data.insert("matrix".to_string(), serde_json::Value::Object(matrix));
        return Ok(render_template(name, &data));
    }

    let values: Vec<String> = combination
        .iter()
        .map(|(_, value)| {
            scalar_to_string(value).unwrap_or_else(|| {
                serde_json::to_string(value).unwrap_or_default()
            })
        })
        .collect();
    Ok(format!("{name} ({})", values.join(", ")))
}
