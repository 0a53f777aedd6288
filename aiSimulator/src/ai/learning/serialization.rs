//! On-disk form of the value table.
//!
//! A model file is a JSON object keyed by state-key strings (`"p0,p1,p2,p3|roll"`),
//! each holding an object from action keys `"0"`..`"3"` to values. There is no
//! version field; anything that does not have exactly this shape is rejected.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::ai::learning::agent::{ActionValues, ValueTable};
use crate::ai::learning::state_key::StateKey;
use crate::config::constants::PIECES_PER_PLAYER;

/// Serializable mirror of [`ValueTable`]. `BTreeMap` keeps saved files stable.
pub type SerializableTable = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug)]
pub enum ModelError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Malformed(String),
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io(err)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Json(err)
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Io(e) => write!(f, "IO error: {}", e),
            ModelError::Json(e) => write!(f, "Model is not a state -> action -> value mapping: {}", e),
            ModelError::Malformed(s) => write!(f, "Malformed model: {}", s),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Io(e) => Some(e),
            ModelError::Json(e) => Some(e),
            ModelError::Malformed(_) => None,
        }
    }
}

pub fn to_serializable(table: &ValueTable) -> SerializableTable {
    table
        .iter()
        .map(|(key, values)| {
            let actions = values
                .iter()
                .enumerate()
                .filter_map(|(action, value)| value.map(|v| (action.to_string(), v)))
                .collect();
            (key.to_string(), actions)
        })
        .collect()
}

/// Converts a parsed file into a table. Fails on the first bad key so nothing
/// partial ever reaches the caller.
pub fn from_serializable(serializable: SerializableTable) -> Result<ValueTable, ModelError> {
    let mut table = HashMap::with_capacity(serializable.len());
    for (raw_key, actions) in serializable {
        let key: StateKey = raw_key
            .parse()
            .map_err(|e| ModelError::Malformed(format!("{}", e)))?;

        let mut values: ActionValues = [None; PIECES_PER_PLAYER];
        for (raw_action, value) in actions {
            let action = raw_action
                .parse::<usize>()
                .ok()
                .filter(|&a| a < PIECES_PER_PLAYER && raw_action == a.to_string())
                .ok_or_else(|| {
                    ModelError::Malformed(format!("invalid action key '{}' under state '{}'", raw_action, raw_key))
                })?;
            if !value.is_finite() {
                return Err(ModelError::Malformed(format!(
                    "non-finite value for action {} under state '{}'",
                    action, raw_key
                )));
            }
            values[action] = Some(value);
        }

        if table.insert(key, values).is_some() {
            return Err(ModelError::Malformed(format!("duplicate state '{}'", raw_key)));
        }
    }
    Ok(table)
}

pub fn parse_model(json: &str) -> Result<ValueTable, ModelError> {
    let serializable: SerializableTable = serde_json::from_str(json)?;
    from_serializable(serializable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_level_mapping() {
        let table = parse_model(r#"{"-1,-1,-1,-1|6": {"0": 0.5, "2": 1.25}}"#).unwrap();
        let key = StateKey::new([-1; 4], 6);
        assert_eq!(table[&key], [Some(0.5), None, Some(1.25), None]);
    }

    #[test]
    fn keeps_states_without_actions() {
        let table = parse_model(r#"{"0,0,0,0|1": {}}"#).unwrap();
        assert_eq!(table[&StateKey::new([0; 4], 1)], [None; 4]);
    }

    #[test]
    fn rejects_wrong_shapes() {
        for bad in [
            "[]",
            r#"{"0,0,0,0|1": 3.0}"#,
            r#"{"0,0,0,0|1": {"0": "high"}}"#,
            r#"{"0,0,0,0|1": {"0": {"1": 2.0}}}"#,
            "not json",
        ] {
            assert!(matches!(parse_model(bad), Err(ModelError::Json(_))), "accepted {}", bad);
        }
    }

    #[test]
    fn rejects_bad_keys() {
        for bad in [
            r#"{"0,0,0|1": {"0": 1.0}}"#,
            r#"{"0,0,0,0|1": {"4": 1.0}}"#,
            r#"{"0,0,0,0|1": {"01": 1.0}}"#,
            r#"{"0,0,0,0|1": {"x": 1.0}}"#,
            r#"{"0,0,0,0|1": {"0": 1.0}, "0, 0,0,0|1": {"1": 1.0}}"#,
        ] {
            assert!(matches!(parse_model(bad), Err(ModelError::Malformed(_))), "accepted {}", bad);
        }
    }

    #[test]
    fn serializable_form_uses_string_action_keys() {
        let mut table = ValueTable::new();
        table.insert(StateKey::new([3, -1, -1, -1], 2), [None, Some(2.0), None, None]);
        let out = to_serializable(&table);
        assert_eq!(out["3,-1,-1,-1|2"]["1"], 2.0);
        assert_eq!(out["3,-1,-1,-1|2"].len(), 1);
    }
}
