//! cidrtree CLI - Command line interface for the cidrtree prefix trie
//!
//! Each invocation loads one or two network lists, runs a single operation in
//! memory and prints the result as JSON.

use anyhow::Context;
use cidrtree::input::{build, load_entries};
use cidrtree::ops::{difference, flatten, union};
use cidrtree::{bits, parse_network, Config, InsertPolicy, NodeRef, PrefixTrie};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cidrtree")]
#[command(about = "Index, subtract and summarize IPv4 networks")]
#[command(version)]
struct Cli {
    /// Output format (json or text)
    #[arg(short, long, default_value = "json", global = true)]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep nested registrations and count every insertion
    #[arg(long, global = true)]
    tally: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered networks of a file ("-" reads stdin)
    List {
        /// Network list
        input: PathBuf,
    },

    /// Promote densely allocated blocks, then list registered networks
    Summarize {
        /// Network list, with optional host counts
        input: PathBuf,
        /// Fullness threshold (defaults to the configured one)
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Find the registered network covering a network
    Supernet {
        /// Network list
        input: PathBuf,
        /// Network to look up
        network: String,
    },

    /// Count the hosts registered within a network
    Size {
        /// Network list
        input: PathBuf,
        /// Network to measure
        network: String,
    },

    /// Remove networks, splitting any registration that covers them
    Remove {
        /// Network list
        input: PathBuf,
        /// Networks to remove
        #[arg(required = true)]
        networks: Vec<String>,
    },

    /// Networks of LEFT that do not appear in RIGHT
    Diff {
        left: PathBuf,
        right: PathBuf,
    },

    /// Networks of LEFT and RIGHT together
    Union {
        left: PathBuf,
        right: PathBuf,
    },

    /// Split the address space into 2^BITS equal blocks
    Split {
        bits: u8,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };
    if cli.tally {
        config.policy = InsertPolicy::Tally;
    }

    match cli.command {
        Commands::List { input } => {
            let trie = load_trie(&input, &config)?;
            output(&cli.format, &subnets_json(&trie));
        }

        Commands::Summarize { input, threshold } => {
            let mut trie = load_trie(&input, &config)?;
            let threshold = threshold.unwrap_or(config.aggregate_threshold);
            let promoted = trie.aggregate(threshold)?;
            let mut value = subnets_json(&trie);
            value["threshold"] = serde_json::json!(threshold);
            value["promoted"] = serde_json::json!(promoted);
            output(&cli.format, &value);
        }

        Commands::Supernet { input, network } => {
            let trie = load_trie(&input, &config)?;
            let net = parse_network(&network)?;
            match trie.supernet(net) {
                Some(node) => {
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "status": "ok",
                            "network": net.to_string(),
                            "supernet": node.summary()
                        }),
                    );
                }
                None => {
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "status": "error",
                            "message": format!("No registered network covers {}", net)
                        }),
                    );
                    std::process::exit(1);
                }
            }
        }

        Commands::Size { input, network } => {
            let trie = load_trie(&input, &config)?;
            let net = parse_network(&network)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "network": net.to_string(),
                    "size": trie.sizeof(net),
                    "capacity": bits::capacity(net.prefix_len())
                }),
            );
        }

        Commands::Remove { input, networks } => {
            // Parse everything before touching the trie.
            let targets = networks
                .iter()
                .map(|n| parse_network(n))
                .collect::<cidrtree::Result<Vec<_>>>()?;
            let mut trie = load_trie(&input, &config)?;
            let released: u64 = targets.into_iter().map(|net| trie.delete(net)).sum();
            let mut value = subnets_json(&trie);
            value["released"] = serde_json::json!(released);
            output(&cli.format, &value);
        }

        Commands::Diff { left, right } => {
            let a = load_trie(&left, &config)?;
            let b = load_trie(&right, &config)?;
            output(&cli.format, &flat_json(&difference(&a, &b)));
        }

        Commands::Union { left, right } => {
            let a = load_trie(&left, &config)?;
            let b = load_trie(&right, &config)?;
            output(&cli.format, &flat_json(&union(&a, &b)));
        }

        Commands::Split { bits } => {
            let blocks: Vec<String> = bits::split_space(bits)?
                .map(|n| n.to_string())
                .collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "count": blocks.len(),
                    "networks": blocks
                }),
            );
        }

        Commands::Config { init } => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => Config::default_path()?,
            };
            if init {
                config.save_to(&path)?;
            }
            output(
                &cli.format,
                &serde_json::json!({
                    "path": path.display().to_string(),
                    "written": init,
                    "config": config
                }),
            );
        }
    }

    Ok(())
}

fn load_trie(path: &Path, config: &Config) -> anyhow::Result<PrefixTrie> {
    let entries =
        load_entries(path).with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(build(&entries, config.policy))
}

fn subnets_json(trie: &PrefixTrie) -> serde_json::Value {
    let items: Vec<_> = trie.subnets().iter().map(NodeRef::summary).collect();
    serde_json::json!({
        "count": items.len(),
        "total_size": trie.total_size(),
        "subnets": items
    })
}

fn flat_json(trie: &PrefixTrie) -> serde_json::Value {
    let networks: Vec<String> = flatten(trie).iter().map(|n| n.to_string()).collect();
    serde_json::json!({
        "count": networks.len(),
        "total_size": trie.total_size(),
        "networks": networks
    })
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", value);
        }
        OutputFormat::Text => {
            println!("{:#}", value);
        }
    }
}
