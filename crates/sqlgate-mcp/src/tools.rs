//! Tool registry and the builtin tool surface.
//!
//! The gateway exposes two tools: `query` (run a SQL statement under the
//! session grant) and `schema` (describe a table, or every table).

use crate::protocol::{ToolAnnotations, ToolDefinition};
use serde_json::json;
use std::collections::HashMap;

pub const QUERY_TOOL: &str = "query";
pub const SCHEMA_TOOL: &str = "schema";

/// The builtin tool definitions.
pub fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: QUERY_TOOL.to_string(),
            description: Some(
                "Run a SQL statement against the session's database, subject to the session's permission grant".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": "SQL statement to execute"
                    }
                },
                "required": ["sql"]
            }),
            annotations: None,
        },
        ToolDefinition {
            name: SCHEMA_TOOL.to_string(),
            description: Some(
                "Describe a table's columns, or every table when no name is given".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Table to describe; omit to list all tables"
                    }
                }
            }),
            annotations: Some(ToolAnnotations {
                read_only: Some(true),
            }),
        },
    ]
}

/// Registry of available tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the builtin tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for tool in builtin_tools() {
            registry.register(tool);
        }
        registry
    }

    pub fn register(&mut self, tool: ToolDefinition) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tools, sorted by name for stable listings.
    pub fn list(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<&ToolDefinition> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = ToolRegistry::with_builtins();
        assert!(registry.contains(QUERY_TOOL));
        assert!(registry.contains(SCHEMA_TOOL));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn query_tool_requires_sql() {
        let registry = ToolRegistry::with_builtins();
        let tool = registry.get(QUERY_TOOL).unwrap();
        assert_eq!(tool.input_schema["required"][0], "sql");
    }

    #[test]
    fn list_is_sorted_by_name() {
        let registry = ToolRegistry::with_builtins();
        let names: Vec<&str> = registry.list().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![QUERY_TOOL, SCHEMA_TOOL]);
    }

    #[test]
    fn schema_tool_is_marked_read_only() {
        let registry = ToolRegistry::with_builtins();
        let tool = registry.get(SCHEMA_TOOL).unwrap();
        assert_eq!(
            tool.annotations.as_ref().and_then(|a| a.read_only),
            Some(true)
        );
    }
}
