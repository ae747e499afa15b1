use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::{Context, bail},
    clap::{Parser, Subcommand},
    serde_json::{Map, Value},
    stockwire_config::{McpServerEntry, Severity, StockwireConfig},
    stockwire_mcp::{
        McpClient, McpServerConfig, StockTools, Timeouts, ToolCallResult, TransportType,
        stocks::STOCK_TOOLS,
    },
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "stockwire", about = "Stockwire: call stock-data tools over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and the user config dir).
    #[arg(long, global = true, env = "STOCKWIRE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tools the server advertises.
    Tools,
    /// Call any tool by name.
    Call {
        name: String,
        /// Arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Current price for a ticker.
    Price { symbol: String },
    /// Company overview for a ticker.
    Info { symbol: String },
    /// Compare comma-separated tickers.
    Compare { symbols: String },
    /// Show connection state and liveness.
    Status,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so tool output on stdout stays pipeable.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<StockwireConfig> {
    let config = match path {
        Some(path) => stockwire_config::load_config(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => stockwire_config::discover_and_load(),
    };
    let config = stockwire_config::apply_env_overrides(config);

    let result = stockwire_config::validate(&config);
    for diagnostic in &result.diagnostics {
        match diagnostic.severity {
            Severity::Error => eprintln!("{diagnostic}"),
            Severity::Warning => warn!(%diagnostic, "config"),
        }
    }
    if result.has_errors() {
        bail!("invalid configuration");
    }
    Ok(config)
}

fn server_config(entry: &McpServerEntry) -> anyhow::Result<McpServerConfig> {
    let transport: TransportType = entry.transport.parse()?;
    let expected_tools = if entry.expected_tools.is_empty() {
        STOCK_TOOLS.iter().map(|t| t.to_string()).collect()
    } else {
        entry.expected_tools.clone()
    };
    Ok(McpServerConfig {
        name: entry.name.clone(),
        transport,
        url: (!entry.url.is_empty()).then(|| entry.url.clone()),
        command: entry.command.clone(),
        args: entry.args.clone(),
        env: entry.env.clone(),
        expected_tools,
        timeouts: Timeouts {
            discovery: Duration::from_secs(entry.timeouts.discovery_secs),
            call: Duration::from_secs(entry.timeouts.call_secs),
            subprocess_call: Duration::from_secs(entry.timeouts.subprocess_call_secs),
        },
    })
}

fn parse_arguments(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("--args is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--args must be a JSON object, got {other}"),
    }
}

fn print_result(result: &ToolCallResult) -> anyhow::Result<()> {
    match result {
        ToolCallResult::Success { text } => println!("{text}"),
        ToolCallResult::Failure { .. } => println!("{}", serde_json::to_string_pretty(result)?),
    }
    Ok(())
}

async fn run(command: Commands, client: &Arc<McpClient>) -> anyhow::Result<()> {
    let stocks = StockTools::new(Arc::clone(client));
    match command {
        Commands::Tools => {
            println!(
                "{}",
                serde_json::to_string_pretty(&client.list_capabilities())?
            );
        },
        Commands::Call { name, args } => {
            let arguments = parse_arguments(&args)?;
            print_result(&client.invoke(&name, arguments).await)?;
        },
        Commands::Price { symbol } => print_result(&stocks.price(&symbol).await)?,
        Commands::Info { symbol } => print_result(&stocks.company_overview(&symbol).await)?,
        Commands::Compare { symbols } => print_result(&stocks.compare(&symbols).await)?,
        Commands::Status => {
            println!("server:  {}", client.server_name());
            println!("state:   {:?}", client.state());
            println!("alive:   {}", client.is_alive().await);
            if let Some(reason) = client.degraded_reason() {
                println!("reason:  {reason}");
            }
            println!("tools:   {}", client.tools().len());
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "stockwire starting");

    let config = load_config(cli.config.as_ref())?;
    let server = server_config(&config.mcp)?;
    let client = Arc::new(McpClient::connect(&server).await);

    let outcome = run(cli.command, &client).await;
    client.close().await;
    outcome
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_from_defaults() {
        let server = server_config(&McpServerEntry::default()).unwrap();
        assert_eq!(server.name, "stocks");
        assert_eq!(server.transport, TransportType::Http);
        assert_eq!(server.url.as_deref(), Some("http://mcp-server:3000"));
        assert_eq!(server.expected_tools, STOCK_TOOLS);
        assert_eq!(server.timeouts, Timeouts::default());
    }

    #[test]
    fn server_config_keeps_explicit_tools_and_timeouts() {
        let mut entry = McpServerEntry {
            transport: "stdio".into(),
            command: "node".into(),
            args: vec!["build/index.js".into()],
            expected_tools: vec!["get_stock_price".into()],
            ..Default::default()
        };
        entry.timeouts.subprocess_call_secs = 3;

        let server = server_config(&entry).unwrap();
        assert_eq!(server.transport, TransportType::Stdio);
        assert_eq!(server.expected_tools, vec!["get_stock_price"]);
        assert_eq!(server.call_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn server_config_rejects_unknown_transport() {
        let entry = McpServerEntry {
            transport: "carrier-pigeon".into(),
            ..Default::default()
        };
        assert!(server_config(&entry).is_err());
    }

    #[test]
    fn arguments_must_be_an_object() {
        let map = parse_arguments(r#"{"symbol":"AAPL"}"#).unwrap();
        assert_eq!(map["symbol"], "AAPL");
        assert!(parse_arguments("[1,2]").is_err());
        assert!(parse_arguments("not json").is_err());
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockwire.toml");
        std::fs::write(
            &path,
            "[mcp]\ntransport = \"stdio\"\ncommand = \"node\"\nargs = [\"index.js\"]\n",
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.mcp.transport, "stdio");
        assert_eq!(config.mcp.args, vec!["index.js"]);
    }
}
