//! Typed helpers for the stock-data tools the agent uses.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::{client::McpClient, types::ToolCallResult};

pub const GET_STOCK_PRICE: &str = "get_stock_price";
pub const GET_COMPANY_OVERVIEW: &str = "get_company_overview";
pub const COMPARE_STOCKS: &str = "compare_stocks";

/// Tool names the stock server is expected to provide.
pub const STOCK_TOOLS: &[&str] = &[GET_STOCK_PRICE, GET_COMPANY_OVERVIEW, COMPARE_STOCKS];

/// Trim and upper-case a ticker; `None` when nothing is left.
pub fn normalize_symbol(symbol: &str) -> Option<String> {
    let symbol = symbol.trim();
    (!symbol.is_empty()).then(|| symbol.to_ascii_uppercase())
}

/// Split `"aapl, msft,,googl"` into `["AAPL", "MSFT", "GOOGL"]`.
pub fn parse_symbol_list(symbols: &str) -> Vec<String> {
    symbols.split(',').filter_map(normalize_symbol).collect()
}

pub struct StockTools {
    client: Arc<McpClient>,
}

impl StockTools {
    pub fn new(client: Arc<McpClient>) -> Self {
        Self { client }
    }

    /// Current price, change and volume for one ticker.
    pub async fn price(&self, symbol: &str) -> ToolCallResult {
        self.single_symbol(GET_STOCK_PRICE, symbol).await
    }

    /// Company name, sector, fundamentals and a short description.
    pub async fn company_overview(&self, symbol: &str) -> ToolCallResult {
        self.single_symbol(GET_COMPANY_OVERVIEW, symbol).await
    }

    /// Compare several comma-separated tickers.
    pub async fn compare(&self, symbols: &str) -> ToolCallResult {
        let list = parse_symbol_list(symbols);
        if list.is_empty() {
            return ToolCallResult::failure(format!(
                "'{COMPARE_STOCKS}' needs at least one ticker symbol, got '{symbols}'"
            ));
        }
        self.client
            .invoke(COMPARE_STOCKS, arguments(json!({ "symbols": list })))
            .await
    }

    async fn single_symbol(&self, tool: &str, symbol: &str) -> ToolCallResult {
        let Some(symbol) = normalize_symbol(symbol) else {
            return ToolCallResult::failure(format!("'{tool}' needs a ticker symbol"));
        };
        self.client
            .invoke(tool, arguments(json!({ "symbol": symbol })))
            .await
    }
}

fn arguments(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
