//! CLI Tooling
//!
//! Inspect and maintain snapshot databases from the command line. Every command
//! opens the addressed snapshot, performs one operation and closes it again, so
//! the tool never holds the database longer than needed.

use crate::config::{ConfigLoader, SnapshotConfig};
use crate::logging::LoggingConfig;
use crate::model::{Endpoint, PathSyncTarget};
use crate::snapshot::Snapshot;
use crate::tree::TreeNode;
use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// Treesnap CLI - persistent tree snapshots of synchronization endpoints
#[derive(Parser, Debug)]
#[command(name = "treesnap")]
#[command(about = "Inspect and maintain tree snapshots of synchronization endpoints")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Root directory of snapshot databases (overrides config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging configuration with command-line overrides applied on top of `base`.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.file = Some(file.clone());
        }
        config
    }
}

/// Addresses one snapshot of one sync pair
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Sync pair identifier
    #[arg(long)]
    pub sync: String,

    /// Snapshot name within the sync pair
    #[arg(long)]
    pub name: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List nodes under a path
    List {
        #[command(flatten)]
        target: SnapshotArgs,
        /// Walk root
        #[arg(default_value = "/")]
        root: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show a single node
    Show {
        #[command(flatten)]
        target: SnapshotArgs,
        path: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show snapshot location and node counts
    Info {
        #[command(flatten)]
        target: SnapshotArgs,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Remove a node and its subtree
    Rm {
        #[command(flatten)]
        target: SnapshotArgs,
        path: String,
    },
    /// Move a node and its subtree
    Mv {
        #[command(flatten)]
        target: SnapshotArgs,
        from: String,
        to: String,
    },
    /// Capture the snapshot from another snapshot
    Copy {
        #[command(flatten)]
        target: SnapshotArgs,
        /// Name of the source snapshot
        #[arg(long)]
        from_name: String,
        /// Sync pair of the source snapshot (defaults to the target's)
        #[arg(long)]
        from_sync: Option<String>,
        /// Restrict the capture to these roots
        paths: Vec<String>,
    },
    /// Delete the snapshot storage of a sync pair
    Purge {
        #[command(flatten)]
        target: SnapshotArgs,
    },
    /// Print the effective configuration
    Config,
}

/// CLI context holding the effective configuration
pub struct CliContext {
    config: SnapshotConfig,
    config_path: Option<PathBuf>,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => ConfigLoader::load().context("loading configuration")?,
        };
        if let Some(dir) = data_dir {
            config.data_dir = Some(dir);
        }
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Context over an already built configuration
    pub fn from_config(config: SnapshotConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::List {
                target,
                root,
                format,
            } => self.with_snapshot(target, |snapshot| {
                let nodes = snapshot
                    .iter_nodes(root)?
                    .map(|item| item.map(|(_, node)| node))
                    .collect::<Result<Vec<_>, _>>()?;
                format_node_list(&nodes, format)
            }),
            Commands::Show {
                target,
                path,
                format,
            } => self.with_snapshot(target, |snapshot| {
                let node = snapshot
                    .load_node(path)
                    .with_context(|| format!("loading {}", path))?;
                format_node(&node, format)
            }),
            Commands::Info { target, format } => self.with_snapshot(target, |snapshot| {
                let stats = snapshot.stats()?;
                let info = snapshot.endpoint_info();
                if format == "json" {
                    return Ok(serde_json::to_string_pretty(&json!({
                        "uri": info.uri,
                        "database": snapshot.database_path(),
                        "empty": snapshot.is_empty(),
                        "leaves": stats.leaves,
                        "collections": stats.collections,
                        "placeholders": stats.placeholders,
                    }))?);
                }
                let mut table = Table::new();
                table.load_preset(comfy_table::presets::UTF8_FULL);
                table.set_header(vec!["Property", "Value"]);
                table.add_row(vec!["URI".to_string(), info.uri]);
                table.add_row(vec![
                    "Database".to_string(),
                    snapshot.database_path().display().to_string(),
                ]);
                table.add_row(vec!["Empty".to_string(), snapshot.is_empty().to_string()]);
                table.add_row(vec!["Leaves".to_string(), stats.leaves.to_string()]);
                table.add_row(vec!["Collections".to_string(), stats.collections.to_string()]);
                table.add_row(vec!["Placeholders".to_string(), stats.placeholders.to_string()]);
                Ok(table.to_string())
            }),
            Commands::Rm { target, path } => self.with_snapshot(target, |snapshot| {
                snapshot.delete_node(path)?;
                Ok(format!("Removed {}", path))
            }),
            Commands::Mv { target, from, to } => self.with_snapshot(target, |snapshot| {
                snapshot.move_node(from, to)?;
                Ok(format!("Moved {} to {}", from, to))
            }),
            Commands::Copy {
                target,
                from_name,
                from_sync,
                paths,
            } => {
                let source_sync = from_sync.as_deref().unwrap_or(&target.sync);
                if source_sync == target.sync && *from_name == target.name {
                    bail!("source and target are the same snapshot");
                }
                let source = Snapshot::open(from_name, source_sync, &self.config)
                    .with_context(|| format!("opening source snapshot {}", from_name))?;
                let outcome = self.with_snapshot(target, |snapshot| {
                    let roots: Vec<&str> = paths.iter().map(String::as_str).collect();
                    snapshot.capture(&source, &roots)?;
                    let stats = snapshot.stats()?;
                    Ok(format!(
                        "Captured {} leaves and {} collections from {}",
                        stats.leaves,
                        stats.collections,
                        source.endpoint_info().uri
                    ))
                });
                source.close(false)?;
                outcome
            }
            Commands::Purge { target } => {
                let snapshot = self.open(target)?;
                let folder = snapshot.location().folder.clone();
                snapshot.close(true)?;
                info!(sync = %target.sync, folder = %folder.display(), "purged sync pair");
                Ok(format!("Purged {}", folder.display()))
            }
            Commands::Config => {
                let mut output = String::new();
                if let Some(path) = &self.config_path {
                    output.push_str(&format!("# loaded from {}\n", path.display()));
                }
                output.push_str(
                    &toml::to_string_pretty(&self.config).context("rendering configuration")?,
                );
                Ok(output)
            }
        }
    }

    fn open(&self, target: &SnapshotArgs) -> Result<Snapshot> {
        Snapshot::open(&target.name, &target.sync, &self.config).with_context(|| {
            format!("opening snapshot {} of sync {}", target.name, target.sync)
        })
    }

    /// Run `f` against the addressed snapshot and close it afterwards, also on error.
    fn with_snapshot<F>(&self, target: &SnapshotArgs, f: F) -> Result<String>
    where
        F: FnOnce(&Snapshot) -> Result<String>,
    {
        let snapshot = self.open(target)?;
        let outcome = f(&snapshot);
        snapshot.close(false)?;
        outcome
    }
}

fn format_mtime(mtime: i64) -> String {
    if mtime <= 0 {
        return "-".to_string();
    }
    Utc.timestamp_opt(mtime, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| mtime.to_string())
}

fn node_type_label(node: &TreeNode) -> &'static str {
    if node.is_leaf() {
        "leaf"
    } else if node.is_placeholder() {
        "collection*"
    } else {
        "collection"
    }
}

fn format_node_list(nodes: &[TreeNode], format: &str) -> Result<String> {
    if format == "json" {
        return Ok(serde_json::to_string_pretty(nodes)?);
    }
    if nodes.is_empty() {
        return Ok("No nodes".to_string());
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Path", "Type", "Size", "Modified", "ETag"]);
    for node in nodes {
        table.add_row(vec![
            node.path.clone(),
            node_type_label(node).to_string(),
            node.size.to_string(),
            format_mtime(node.mtime),
            node.etag.clone(),
        ]);
    }
    Ok(table.to_string())
}

fn format_node(node: &TreeNode, format: &str) -> Result<String> {
    if format == "json" {
        return Ok(serde_json::to_string_pretty(node)?);
    }
    let mut output = String::new();
    output.push_str(&format!("Path:     {}\n", node.path));
    output.push_str(&format!("Type:     {}\n", node_type_label(node)));
    output.push_str(&format!("UUID:     {}\n", node.uuid));
    output.push_str(&format!("Size:     {}\n", node.size));
    output.push_str(&format!("Modified: {}\n", format_mtime(node.mtime)));
    output.push_str(&format!("Mode:     {:o}\n", node.mode));
    output.push_str(&format!("ETag:     {}", node.etag));
    Ok(output)
}
