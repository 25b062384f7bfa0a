// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! elasticache-discover - Print the live nodes of an ElastiCache cluster
//!
//! Runs one discovery against the configuration endpoint and prints the
//! node list.
//!
//! # Usage
//!
//! ```bash
//! # Endpoint from the environment
//! ELASTICACHE_ENDPOINT=my-cluster.cfg.use1.cache.amazonaws.com:11211 elasticache-discover
//!
//! # Explicit endpoint, JSON output, 2 second budget
//! elasticache-discover -e my-cluster.cfg.use1.cache.amazonaws.com:11211 -f json --timeout 2
//! ```

use clap::Parser;
use colored::*;
use elasticache_discovery::{ClusterConfig, ClusterDiscoveryClient, DiscoveryConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Print the live nodes behind an ElastiCache configuration endpoint
#[derive(Parser, Debug)]
#[command(name = "elasticache-discover")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration endpoint (host:port); falls back to ELASTICACHE_ENDPOINT
    #[arg(short, long, default_value = "")]
    endpoint: String,

    /// Discovery configuration file (JSON format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overall discovery timeout in seconds (overrides the config file)
    #[arg(long)]
    timeout: Option<u64>,

    /// Output format: pretty, json, plain
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,

    /// Fail when the reply carries no node list
    #[arg(long)]
    strict: bool,

    /// Write the effective configuration to a JSON file and exit
    #[arg(long, value_name = "PATH")]
    dump_config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Pretty,
    Json,
    Plain,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "p" => Ok(OutputFormat::Pretty),
            "json" | "j" => Ok(OutputFormat::Json),
            "plain" | "list" => Ok(OutputFormat::Plain),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// JSON output: the decoded cluster tagged with the endpoint it came from.
#[derive(Serialize)]
struct Report<'a> {
    endpoint: &'a str,
    #[serde(flatten)]
    cluster: &'a ClusterConfig,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&args.log_level)?;

    let config = build_config(args)?;
    debug!("Discovery config: {:?}", config);

    if let Some(path) = &args.dump_config {
        config.to_file(path)?;
        println!("{} {}", "Config written to".green(), path.display());
        return Ok(());
    }

    let client = ClusterDiscoveryClient::new(config)?;
    let endpoint = client.resolve_endpoint(&args.endpoint)?;
    info!("Discovering cluster behind {}", endpoint);

    let cluster = client.discover_cluster(&endpoint)?;
    print!("{}", render(&endpoint, &cluster, args.format)?);
    Ok(())
}

fn init_logging(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG wins over --log-level.
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    // try_init also routes `log` records from the library into this subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| -> Box<dyn std::error::Error> { e })
}

fn build_config(args: &Args) -> Result<DiscoveryConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            DiscoveryConfig::from_file(path)?
        }
        None => DiscoveryConfig::default(),
    };

    if let Some(secs) = args.timeout {
        config = config.with_deadline(Duration::from_secs(secs));
    }
    if args.strict {
        config = config.require_payload();
    }

    config.validate()?;
    Ok(config)
}

fn render(
    endpoint: &str,
    cluster: &ClusterConfig,
    format: OutputFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut out = String::new();

    match format {
        OutputFormat::Plain => {
            for address in cluster.addresses() {
                out.push_str(&address);
                out.push('\n');
            }
        }
        OutputFormat::Json => {
            let report = Report { endpoint, cluster };
            out.push_str(&serde_json::to_string_pretty(&report)?);
            out.push('\n');
        }
        OutputFormat::Pretty => {
            let version = cluster
                .version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".to_string());

            out.push_str(&format!("\n{}\n\n", "=== ElastiCache Cluster ===".bold()));
            out.push_str(&format!(
                "{} {}  (config version {})\n\n",
                "Endpoint:".cyan().bold(),
                endpoint,
                version.white()
            ));

            if cluster.is_empty() {
                out.push_str(&format!("  {}\n", "No nodes reported".yellow()));
            }
            for (i, node) in cluster.nodes.iter().enumerate() {
                out.push_str(&format!(
                    "  {} {}  {}\n",
                    format!("[{}]", i + 1).yellow(),
                    node.address().green(),
                    node.host().dimmed()
                ));
            }

            out.push_str(&format!(
                "\n{}\n  Nodes: {}\n\n",
                "--- Summary ---".dimmed(),
                cluster.len().to_string().white()
            ));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use elasticache_discovery::NodeRecord;

    fn sample() -> ClusterConfig {
        ClusterConfig {
            version: Some(4),
            nodes: vec![
                NodeRecord::new("node-a", "10.0.0.1", 11211),
                NodeRecord::new("node-b", "10.0.0.2", 11211),
            ],
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("P".parse::<OutputFormat>(), Ok(OutputFormat::Pretty));
        assert_eq!("list".parse::<OutputFormat>(), Ok(OutputFormat::Plain));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "elasticache-discover",
            "-e",
            "cfg.example:11211",
            "-f",
            "json",
            "--timeout",
            "3",
            "--strict",
        ])
        .unwrap();
        assert_eq!(args.endpoint, "cfg.example:11211");
        assert_eq!(args.format, OutputFormat::Json);

        let config = build_config(&args).unwrap();
        assert_eq!(config.deadline(), Duration::from_secs(3));
        assert!(config.require_payload);
    }

    #[test]
    fn test_build_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discovery.json");
        std::fs::write(&path, r#"{"io_timeout_ms": 750}"#).unwrap();

        let args = Args::try_parse_from([
            "elasticache-discover",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(config.io_timeout(), Duration::from_millis(750));
        assert!(!config.require_payload);
    }

    #[test]
    fn test_dumped_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("effective.json");

        let args = Args::try_parse_from([
            "elasticache-discover",
            "--timeout",
            "7",
            "--strict",
            "--dump-config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let config = build_config(&args).unwrap();
        config.to_file(args.dump_config.as_deref().unwrap()).unwrap();

        let reload = Args::try_parse_from([
            "elasticache-discover",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let loaded = build_config(&reload).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.deadline(), Duration::from_secs(7));
        assert!(loaded.require_payload);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let args = Args::try_parse_from(["elasticache-discover", "--timeout", "0"]).unwrap();
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_render_plain() {
        let out = render("cfg:11211", &sample(), OutputFormat::Plain).unwrap();
        assert_eq!(out, "10.0.0.1:11211\n10.0.0.2:11211\n");
    }

    #[test]
    fn test_render_json() {
        let out = render("cfg:11211", &sample(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["endpoint"], "cfg:11211");
        assert_eq!(value["version"], 4);
        assert_eq!(value["nodes"][1]["address"], "10.0.0.2:11211");
        assert_eq!(value["nodes"][0]["host"], "node-a");
        assert_eq!(value["nodes"][0]["port"], 11211);
    }

    #[test]
    fn test_render_pretty_empty() {
        colored::control::set_override(false);
        let out = render("cfg:11211", &ClusterConfig::default(), OutputFormat::Pretty).unwrap();
        assert!(out.contains("No nodes reported"));
        assert!(out.contains("config version ?"));
    }
}
