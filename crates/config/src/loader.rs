use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::StockwireConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "stockwire.toml",
    "stockwire.yaml",
    "stockwire.yml",
    "stockwire.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<StockwireConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./stockwire.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/stockwire/stockwire.{toml,yaml,yml,json}` (user-global)
///
/// Returns `StockwireConfig::default()` if no usable config file is found.
pub fn discover_and_load() -> StockwireConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    StockwireConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/stockwire/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "stockwire").map(|d| d.config_dir().to_path_buf())
}

/// Apply `STOCKWIRE_MCP_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: StockwireConfig) -> StockwireConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: StockwireConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> StockwireConfig {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty("STOCKWIRE_MCP_URL") {
        debug!(url = %url, "STOCKWIRE_MCP_URL overrides mcp.url");
        config.mcp.url = url;
    }
    if let Some(transport) = non_empty("STOCKWIRE_MCP_TRANSPORT") {
        debug!(transport = %transport, "STOCKWIRE_MCP_TRANSPORT overrides mcp.transport");
        config.mcp.transport = transport;
    }
    if let Some(command) = non_empty("STOCKWIRE_MCP_COMMAND") {
        debug!(command = %command, "STOCKWIRE_MCP_COMMAND overrides mcp.command");
        config.mcp.command = command;
    }
    config
}

fn parse_config(raw: &str, path: &Path) -> Result<StockwireConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockwire.yaml");
        std::fs::write(
            &path,
            "mcp:\n  transport: stdio\n  command: node\n  args: [server.js]\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.mcp.transport, "stdio");
        assert_eq!(cfg.mcp.args, vec!["server.js"]);
    }

    #[test]
    fn loads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockwire.json");
        std::fs::write(&path, r#"{"mcp":{"url":"http://localhost:4000"}}"#).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.mcp.url, "http://localhost:4000");
        assert_eq!(cfg.mcp.transport, "http");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockwire.ini");
        std::fs::write(&path, "[mcp]").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref ext) if ext == "ini"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/stockwire.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/stockwire.toml"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockwire.toml");
        std::fs::write(&path, "[mcp\nurl = ").unwrap();
        assert!(matches!(load_config(&path), Err(Error::Toml(_))));
    }

    #[test]
    fn env_overrides_replace_non_empty_values() {
        let lookup = |name: &str| match name {
            "STOCKWIRE_MCP_URL" => Some("http://override:9000".to_string()),
            "STOCKWIRE_MCP_TRANSPORT" => Some("  ".to_string()),
            _ => None,
        };
        let cfg = apply_env_overrides_with(StockwireConfig::default(), lookup);
        assert_eq!(cfg.mcp.url, "http://override:9000");
        assert_eq!(cfg.mcp.transport, "http");
    }
}
