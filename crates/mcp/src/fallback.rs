//! Stand-in tools used while the server is unavailable.
//!
//! The agent's capability list must never be empty, and every call made
//! against a stand-in resolves to a failure that names what was asked for.

use {
    serde_json::{Map, Value, json},
    tracing::debug,
};

use crate::{
    codec::describe_arguments,
    types::{ToolCallResult, ToolDescriptor},
};

/// Name of the generic placeholder tool.
pub const UNAVAILABLE_TOOL: &str = "tool_unavailable";

/// Placeholders for the tools the server was expected to provide, followed
/// by the generic [`UNAVAILABLE_TOOL`].
pub fn placeholder_descriptors(
    server_name: &str,
    expected_tools: &[String],
    reason: &str,
) -> Vec<ToolDescriptor> {
    let mut tools: Vec<ToolDescriptor> = expected_tools
        .iter()
        .filter(|name| !name.trim().is_empty() && name.as_str() != UNAVAILABLE_TOOL)
        .map(|name| ToolDescriptor {
            name: name.clone(),
            description: format!("Unavailable: the '{server_name}' tool server is down ({reason})"),
            input_schema: json!({"type": "object"}),
        })
        .collect();

    tools.push(ToolDescriptor {
        name: UNAVAILABLE_TOOL.into(),
        description: format!(
            "The '{server_name}' tool server is unavailable, so no tools can run. \
             Calling this explains why ({reason})."
        ),
        input_schema: json!({"type": "object"}),
    });
    tools
}

/// Failure returned for any call while degraded.
pub fn unavailable_result(
    server_name: &str,
    tool_name: &str,
    arguments: &Map<String, Value>,
    reason: &str,
) -> ToolCallResult {
    debug!(server = %server_name, tool = %tool_name, "short-circuiting call on degraded client");

    let subject = if arguments.is_empty() {
        format!("Tool '{tool_name}'")
    } else {
        format!("Tool '{tool_name}' ({})", describe_arguments(arguments))
    };
    ToolCallResult::failure(format!(
        "{subject} could not run because the '{server_name}' tool server is unavailable: {reason}"
    ))
}
