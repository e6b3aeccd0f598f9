//! JMESPath queries against JSON-like describe output.

use serde_json::Value;

use crate::{Ec2ToolsError, Result};

/// Apply a JMESPath expression to a JSON value and return the matches.
///
/// Used by the describe wrappers to select a subset of the response after
/// the resource-category envelope has been unwrapped, e.g. `"[*].instance_id"`
/// to select only instance IDs.
pub fn search(value: &Value, expr: &str) -> Result<Value> {
    let compiled = jmespath::compile(expr).map_err(Ec2ToolsError::query)?;

    let data = jmespath::Variable::from_serializable(value).map_err(Ec2ToolsError::query)?;
    let result = compiled.search(data).map_err(Ec2ToolsError::query)?;

    Ok(serde_json::to_value(&*result)?)
}

/// Shorthand for queries expected to yield a list of strings, such as ID
/// selections. Nulls are dropped by the projection, so records missing the
/// selected field simply don't contribute.
pub fn search_strings(value: &Value, expr: &str) -> Result<Vec<String>> {
    let selected = search(value, expr)?;
    serde_json::from_value(selected).map_err(|e| {
        Ec2ToolsError::Query(format!("expression '{}' did not select strings: {}", expr, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_selects_nested_field() {
        let value = json!([
            {"instance_id": "i-1", "state": "running"},
            {"instance_id": "i-2", "state": "stopped"},
        ]);

        let result = search(&value, "[*].instance_id").unwrap();
        assert_eq!(result, json!(["i-1", "i-2"]));
    }

    #[test]
    fn test_search_identity_expression() {
        let value = json!([{"key_name": "admin"}]);
        assert_eq!(search(&value, "[*]").unwrap(), value);
    }

    #[test]
    fn test_search_strings_drops_nulls() {
        let value = json!([
            {"resource_id": "i-1"},
            {"resource_id": null},
            {"resource_id": "i-2"},
        ]);

        let ids = search_strings(&value, "[*].resource_id").unwrap();
        assert_eq!(ids, vec!["i-1".to_string(), "i-2".to_string()]);
    }

    #[test]
    fn test_search_invalid_expression_is_query_error() {
        let value = json!([]);
        let err = search(&value, "[*").unwrap_err();
        assert!(matches!(err, Ec2ToolsError::Query(_)));
    }

    #[test]
    fn test_search_strings_rejects_non_string_selection() {
        let value = json!([{"size": 8}]);
        assert!(search_strings(&value, "[*].size").is_err());
    }
}
