//! Expose each server tool as an agent-callable tool.
//!
//! Every bridge captures its tool name by value when it is built and shares
//! the client through an `Arc`; nothing is looked up lazily at call time.

use std::{collections::HashMap, sync::Arc};

use {async_trait::async_trait, serde_json::Value};

use crate::{
    client::McpClient,
    types::{ToolCallResult, ToolDescriptor},
};

/// Agent-facing tool interface.
#[async_trait]
pub trait McpAgentTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, params: Value) -> ToolCallResult;
}

pub struct McpToolBridge {
    name: String,
    description: String,
    input_schema: Value,
    client: Arc<McpClient>,
}

impl McpToolBridge {
    pub fn new(tool_def: &ToolDescriptor, client: Arc<McpClient>) -> Self {
        let description = if tool_def.description.trim().is_empty() {
            format!("MCP tool: {}", tool_def.name)
        } else {
            tool_def.description.clone()
        };
        Self {
            name: tool_def.name.clone(),
            description,
            input_schema: tool_def.input_schema.clone(),
            client,
        }
    }

    /// One bridge per tool the client advertises, in advertised order.
    pub fn from_client(client: &Arc<McpClient>) -> Vec<Self> {
        client
            .tools()
            .iter()
            .map(|t| Self::new(t, Arc::clone(client)))
            .collect()
    }

    /// Bridges keyed by tool name, for dispatching an agent's chosen action.
    pub fn index(client: &Arc<McpClient>) -> HashMap<String, Self> {
        Self::from_client(client)
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect()
    }
}

#[async_trait]
impl McpAgentTool for McpToolBridge {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.input_schema.clone()
    }

    async fn execute(&self, params: Value) -> ToolCallResult {
        let arguments = match params {
            Value::Object(map) => map,
            Value::Null => Default::default(),
            other => {
                return ToolCallResult::failure(format!(
                    "arguments for '{}' must be a JSON object, got {other}",
                    self.name
                ));
            },
        };
        self.client.invoke(&self.name, arguments).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::fallback::UNAVAILABLE_TOOL, serde_json::json};

    fn degraded_client() -> Arc<McpClient> {
        Arc::new(McpClient::degraded(
            "stocks",
            "connection refused".into(),
            &["get_stock_price".to_string()],
        ))
    }

    #[test]
    fn test_bridges_capture_names() {
        let client = degraded_client();
        let bridges = McpToolBridge::from_client(&client);
        let names: Vec<_> = bridges.iter().map(|b| b.name().to_string()).collect();
        assert_eq!(names, vec!["get_stock_price", UNAVAILABLE_TOOL]);

        let index = McpToolBridge::index(&client);
        assert_eq!(index["get_stock_price"].name(), "get_stock_price");
    }

    #[test]
    fn test_empty_description_gets_default() {
        let tool = ToolDescriptor {
            name: "get_company_overview".into(),
            description: String::new(),
            input_schema: json!({"type": "object"}),
        };
        let bridge = McpToolBridge::new(&tool, degraded_client());
        assert_eq!(bridge.description(), "MCP tool: get_company_overview");
        assert_eq!(bridge.parameters_schema(), json!({"type": "object"}));
    }

    #[tokio::test]
    async fn test_non_object_params_rejected() {
        let bridge = McpToolBridge::from_client(&degraded_client()).remove(0);
        let result = bridge.execute(json!("AAPL")).await;
        let ToolCallResult::Failure { reason } = result else {
            panic!("expected failure");
        };
        assert!(reason.contains("must be a JSON object"));
    }

    #[tokio::test]
    async fn test_execute_routes_through_client() {
        let bridge = McpToolBridge::from_client(&degraded_client()).remove(0);
        let result = bridge.execute(json!({"symbol": "MSFT"})).await;
        let ToolCallResult::Failure { reason } = result else {
            panic!("expected failure");
        };
        assert!(reason.contains("get_stock_price"));
        assert!(reason.contains("symbol=MSFT"));
    }
}
