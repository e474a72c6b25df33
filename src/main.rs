use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use tagnet::config::Config;
use tagnet::descriptor::DescriptorTable;
use tagnet::registry::{Action, QualifierRegistry};
use tagnet::resolver::{format_text_path, parse_text_path, resolve};
use tagnet::router::Router;
use tagnet::{adapters, namespace, tlv};

/// Tagnet naming tree tool - inspect the namespace and route requests
#[derive(Parser, Debug)]
#[command(name = "tagnet", version, about)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the naming tree as an outline
    Tree,
    /// Print the descriptor table in schema file form
    Schema,
    /// Resolve a path such as tag/sd/0/dblk/.recnum
    Resolve { path: String },
    /// Print the wire encoding of a path in hex
    Encode { path: String },
    /// Route a hex-encoded wire path through the registry
    Route {
        wire: String,
        #[arg(short, long, default_value = "get")]
        action: Action,
        /// JSON payload handed to the adapter
        #[arg(short, long, default_value = "null")]
        payload: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(config.level())
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &args.config {
        info!(
            path = %path.display(),
            schema = ?config.schema.path,
            parent_check = ?config.schema.parent_check,
            "configuration loaded"
        );
    }

    let table = match &config.schema.path {
        Some(path) => DescriptorTable::from_file(path)?,
        None => DescriptorTable::builtin(),
    };

    let tree = match namespace::init(&table, config.schema.parent_check) {
        Ok(tree) => tree,
        Err(e) => {
            error!(error = %e, "refusing to start with an inconsistent namespace");
            return Err(e.into());
        }
    };

    let registry = Arc::new(QualifierRegistry::new());
    if config.registry.builtin_adapters {
        adapters::register_builtin(&tree, &registry);
    }
    if config.registry.freeze {
        registry.freeze();
    }
    let router = Router::new(tree.clone(), registry);
    info!(nodes = tree.len(), "tagnet ready");

    match args.command {
        Command::Tree => print!("{}", tree),
        Command::Schema => print!("{}", table.to_toml_string()?),
        Command::Resolve { path } => match resolve(&tree, &parse_text_path(&path)) {
            Ok(node) => {
                let full = tree.path_of(node.id).unwrap_or_default();
                println!(
                    "{}\t{}\t{}\t{}",
                    node.id,
                    format_text_path(&full)?,
                    node.qualifier,
                    node.help
                );
            }
            Err(e) => {
                println!("{}", e);
                std::process::exit(1);
            }
        },
        Command::Encode { path } => {
            let bytes = tlv::encode_path(&parse_text_path(&path))?;
            println!("{}", hex::encode(bytes));
        }
        Command::Route {
            wire,
            action,
            payload,
        } => {
            let wire = hex::decode(wire.trim())?;
            let payload: serde_json::Value = serde_json::from_str(&payload)?;
            match router.route(&wire, action, payload) {
                Ok(routed) => println!("{}", serde_json::to_string_pretty(&routed)?),
                Err(e) => {
                    println!("{}", e);
                    std::process::exit(1);
                }
            }
            info!(metrics = ?router.metrics(), "route finished");
        }
    }

    Ok(())
}
