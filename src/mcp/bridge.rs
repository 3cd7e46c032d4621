//! MCP catalog → Messages API tool list.

use serde_json::{json, Value};

use super::McpTool;
use crate::types::ToolDefinition;

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Convert discovered MCP tools into the tool list sent with each
/// completion request. Order and count are preserved; a missing description
/// becomes `""` and a missing, null or `{}` schema becomes an empty object
/// schema.
pub fn to_client_tools(catalog: &[McpTool]) -> Vec<ToolDefinition> {
    catalog
        .iter()
        .map(|tool| ToolDefinition {
            name: tool.name.clone(),
            description: tool.description.clone().unwrap_or_default(),
            input_schema: match &tool.input_schema {
                None | Some(Value::Null) => empty_object_schema(),
                Some(Value::Object(map)) if map.is_empty() => empty_object_schema(),
                Some(schema) => schema.clone(),
            },
        })
        .collect()
}
