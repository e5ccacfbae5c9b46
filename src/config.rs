//! String-valued configuration maps applied through `configure`.

use crate::error::{PipelineError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parameter name to string value; applied in key order.
pub type ParamValues = BTreeMap<String, String>;

/// Builds a `ParamValues` from `(name, value)` pairs.
pub fn param_values<K: Into<String>, V: ToString>(pairs: impl IntoIterator<Item = (K, V)>) -> ParamValues {
    pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())).collect()
}

/// Reads a flat JSON object. Strings, numbers and bools become their string
/// form; nested values and null are rejected.
pub fn param_values_from_json(value: &Value) -> Result<ParamValues> {
    let object = value.as_object().ok_or_else(|| PipelineError::Parse {
        name: "<config>".to_string(),
        value: value.to_string(),
        expected: "a JSON object".to_string(),
    })?;

    object
        .iter()
        .map(|(name, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(PipelineError::Parse {
                        name: name.clone(),
                        value: other.to_string(),
                        expected: "a string, number or bool".to_string(),
                    })
                }
            };
            Ok((name.clone(), text))
        })
        .collect()
}

/// Parses `name=value` command-line assignments.
pub fn parse_assignments<S: AsRef<str>>(args: &[S]) -> Result<ParamValues> {
    args.iter()
        .map(|arg| {
            let arg = arg.as_ref();
            arg.split_once('=')
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| PipelineError::Parse {
                    name: "<argument>".to_string(),
                    value: arg.to_string(),
                    expected: "name=value".to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_scalars_become_strings() {
        let values = param_values_from_json(&json!({
            "levels": 3,
            "gain": 1.5,
            "vectorize": true,
            "input_type": "uint8"
        }))
        .unwrap();

        assert_eq!(values["levels"], "3");
        assert_eq!(values["gain"], "1.5");
        assert_eq!(values["vectorize"], "true");
        assert_eq!(values["input_type"], "uint8");
    }

    #[test]
    fn test_json_rejects_nested_values() {
        assert!(matches!(
            param_values_from_json(&json!({"levels": [1, 2]})),
            Err(PipelineError::Parse { .. })
        ));
        assert!(param_values_from_json(&json!("levels=3")).is_err());
    }

    #[test]
    fn test_assignments() {
        let values = parse_assignments(&["levels=3", "target=host-avx2"]).unwrap();
        assert_eq!(values["target"], "host-avx2");
        assert!(parse_assignments(&["levels"]).is_err());
        assert!(parse_assignments(&["=3"]).is_err());
    }
}
