//! Protocol codec: builds outbound envelopes and validates inbound ones.
//!
//! Independent of the transport; the HTTP adapter and both subprocess
//! transports all hand raw bytes to [`decode`].

use serde_json::{Map, Value};

use crate::{
    error::{DecodeError, Error, Result},
    types::{
        JsonRpcRequest, JsonRpcResponse, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, ToolCallRequest,
        ToolCallResult, ToolDescriptor, ToolsCallParams, ToolsCallResult,
    },
};

/// Returned when a call succeeds but carries no text content.
pub const NO_CONTENT: &str = "No content returned";

pub fn encode_list_tools(id: u64) -> JsonRpcRequest {
    JsonRpcRequest::new(id, METHOD_TOOLS_LIST, None)
}

pub fn encode_call(id: u64, request: &ToolCallRequest) -> Result<JsonRpcRequest> {
    let params = ToolsCallParams {
        name: request.tool_name.clone(),
        arguments: request.arguments.clone(),
    };
    Ok(JsonRpcRequest::new(
        id,
        METHOD_TOOLS_CALL,
        Some(serde_json::to_value(params)?),
    ))
}

/// One request per line, as the subprocess framing requires.
pub fn encode_line(request: &JsonRpcRequest) -> Result<String> {
    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    Ok(line)
}

/// Parse and validate one inbound envelope.
///
/// When `expected_id` is set, a response carrying a different id is
/// rejected. A missing (`null`) id is accepted: it gives no correlation
/// information to contradict.
pub fn decode(raw: &[u8], expected_id: Option<u64>) -> std::result::Result<JsonRpcResponse, DecodeError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::EmptyResponse);
    }

    let response: JsonRpcResponse = serde_json::from_slice(raw)?;
    if response.result.is_none() && response.error.is_none() {
        return Err(DecodeError::MissingPayload);
    }

    if let Some(expected) = expected_id
        && !response.id.is_null()
        && response.id.as_u64() != Some(expected)
    {
        return Err(DecodeError::IdMismatch {
            expected,
            actual: response.id,
        });
    }

    Ok(response)
}

/// Extract `result.tools`. Absent or mis-shaped lists yield an empty list.
pub fn decode_tools(response: &JsonRpcResponse) -> Vec<ToolDescriptor> {
    let Some(tools) = response
        .result
        .as_ref()
        .and_then(|r| r.get("tools"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    tools
        .iter()
        .filter_map(|t| serde_json::from_value::<ToolDescriptor>(t.clone()).ok())
        .collect()
}

/// Map a `tools/call` response to the agent-facing result.
pub fn decode_call(response: &JsonRpcResponse) -> std::result::Result<ToolCallResult, DecodeError> {
    if let Some(err) = &response.error {
        return Ok(ToolCallResult::failure(err.message.clone()));
    }

    let Some(result) = &response.result else {
        return Err(DecodeError::MissingPayload);
    };

    if let Some(message) = result.get("error").and_then(error_message) {
        return Ok(ToolCallResult::failure(message));
    }

    let parsed: ToolsCallResult = serde_json::from_value(result.clone())
        .map_err(|e| DecodeError::CallResult(e.to_string()))?;

    if parsed.is_error {
        let text = joined_text(&parsed);
        return Ok(ToolCallResult::failure(if text.is_empty() {
            "tool reported an error without details".to_string()
        } else {
            text
        }));
    }

    let text = parsed
        .content
        .iter()
        .find_map(|c| c.text.clone())
        .unwrap_or_else(|| NO_CONTENT.to_string());
    Ok(ToolCallResult::success(text))
}

/// Turn a `tools/list` response into descriptors, failing on a remote error.
pub fn tools_or_error(response: &JsonRpcResponse) -> Result<Vec<ToolDescriptor>> {
    match &response.error {
        Some(err) => Err(Error::tool(err.message.clone())),
        None => Ok(decode_tools(response)),
    }
}

/// `"message"` or `{"message": "..."}`.
pub(crate) fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn joined_text(result: &ToolsCallResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| c.text.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Arguments as sent in `params.arguments`; used by logging and fallbacks.
pub fn describe_arguments(arguments: &Map<String, Value>) -> String {
    arguments
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("{k}={s}"),
            other => format!("{k}={other}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn encode_call_wraps_name_and_arguments() {
        let req = ToolCallRequest::new("get_stock_price", args(json!({"symbol": "AAPL"})));
        let envelope = encode_call(4, &req).unwrap();
        assert_eq!(envelope.id, 4);
        assert_eq!(envelope.method, "tools/call");
        assert_eq!(
            envelope.params.unwrap(),
            json!({"name": "get_stock_price", "arguments": {"symbol": "AAPL"}})
        );
    }

    #[test]
    fn encode_line_is_newline_terminated() {
        let line = encode_line(&encode_list_tools(1)).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn decode_echoed_params_roundtrip() {
        let req = ToolCallRequest::new("get_stock_price", args(json!({"symbol": "AAPL"})));
        let envelope = encode_call(9, &req).unwrap();
        let echoed = json!({"jsonrpc": "2.0", "id": 9, "result": envelope.params});
        let resp = decode(echoed.to_string().as_bytes(), Some(9)).unwrap();
        let params: ToolsCallParams = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(params.name, "get_stock_price");
        assert_eq!(params.arguments, req.arguments);
    }

    #[test]
    fn decode_rejects_non_json() {
        let err = decode(b"Server listening on stdio", None).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn decode_rejects_blank() {
        assert!(matches!(decode(b"  \n", None), Err(DecodeError::EmptyResponse)));
    }

    #[test]
    fn decode_rejects_envelope_without_payload() {
        let err = decode(br#"{"jsonrpc":"2.0","id":1}"#, Some(1)).unwrap_err();
        assert!(matches!(err, DecodeError::MissingPayload));
    }

    #[test]
    fn decode_detects_id_mismatch() {
        let err = decode(br#"{"id":2,"result":{}}"#, Some(3)).unwrap_err();
        assert!(matches!(err, DecodeError::IdMismatch { expected: 3, .. }));
        assert!(decode(br#"{"id":2,"result":{}}"#, None).is_ok());
    }

    #[test]
    fn decode_accepts_missing_id() {
        assert!(decode(br#"{"result":{"content":[]}}"#, Some(5)).is_ok());
    }

    #[test]
    fn tools_decoding_is_lenient() {
        let resp = JsonRpcResponse::with_result(
            1,
            json!({"tools": [
                {"name": "get_stock_price", "description": "Quote"},
                {"description": "nameless"},
                {"name": "get_company_overview"}
            ]}),
        );
        let names: Vec<_> = decode_tools(&resp).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["get_stock_price", "get_company_overview"]);

        let wrong_shape = JsonRpcResponse::with_result(1, json!({"tools": "nope"}));
        assert!(decode_tools(&wrong_shape).is_empty());
        let absent = JsonRpcResponse::with_result(1, json!({}));
        assert!(decode_tools(&absent).is_empty());
    }

    #[test]
    fn tools_or_error_surfaces_remote_error() {
        let resp = JsonRpcResponse::with_error(1, 500, "backend down");
        let err = tools_or_error(&resp).unwrap_err();
        assert!(matches!(err, Error::Tool { ref message } if message == "backend down"));
    }

    #[test]
    fn call_first_text_is_result() {
        let resp = JsonRpcResponse::with_result(
            1,
            json!({"content": [{"type": "text", "text": "TSLA: $250.00"}, {"text": "extra"}]}),
        );
        assert_eq!(
            decode_call(&resp).unwrap(),
            ToolCallResult::success("TSLA: $250.00")
        );
    }

    #[test]
    fn call_without_content_returns_sentinel() {
        for result in [json!({}), json!({"content": []}), json!({"content": [{"type": "image"}]})] {
            let resp = JsonRpcResponse::with_result(1, result);
            assert_eq!(decode_call(&resp).unwrap(), ToolCallResult::success(NO_CONTENT));
        }
    }

    #[test]
    fn call_error_variants_become_failures() {
        let top = JsonRpcResponse::with_error(1, 400, "Unknown tool: foo");
        assert_eq!(
            decode_call(&top).unwrap(),
            ToolCallResult::failure("Unknown tool: foo")
        );

        let nested = JsonRpcResponse::with_result(1, json!({"error": {"message": "rate limited"}}));
        assert_eq!(
            decode_call(&nested).unwrap(),
            ToolCallResult::failure("rate limited")
        );

        let flagged = JsonRpcResponse::with_result(
            1,
            json!({"content": [{"type": "text", "text": "{\"error\":\"bad symbol\"}"}], "isError": true}),
        );
        assert_eq!(
            decode_call(&flagged).unwrap(),
            ToolCallResult::failure("{\"error\":\"bad symbol\"}")
        );
    }

    #[test]
    fn call_with_mis_shaped_content_is_decode_error() {
        let resp = JsonRpcResponse::with_result(1, json!({"content": "TSLA"}));
        assert!(matches!(decode_call(&resp), Err(DecodeError::CallResult(_))));
    }

    #[test]
    fn describe_arguments_renders_pairs() {
        let rendered = describe_arguments(&args(json!({"symbol": "TSLA", "days": 5})));
        assert_eq!(rendered, "days=5, symbol=TSLA");
    }
}
