//! Hostpaths - Filesystem Path Builtins
//!
//! CLI entry point for listing and invoking the path builtins through the
//! host calling convention.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hostpaths::runtime::{BuiltinSignature, ReturnKind};
use hostpaths::{
    BuiltinCategory, BuiltinRegistry, HandleManager, ManagedBuffer, PathBuiltins, PathsConfig,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hostpaths")]
#[command(version)]
#[command(about = "Filesystem path builtins for embedded language runtimes", long_about = None)]
struct Cli {
    /// Configuration file (default: hostpaths.toml in the current directory or a parent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filesystem failures and builtin dispatch
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a builtin by name; each argument is passed as a path buffer
    Call {
        /// Builtin name
        name: String,

        /// Builtin arguments
        args: Vec<String>,
    },

    /// Show platform path syntax and the active configuration
    Info,

    /// List registered builtins
    List {
        /// Only builtins of this category
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    Query,
    Listing,
    Mutation,
}

impl From<CategoryArg> for BuiltinCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Query => BuiltinCategory::Query,
            CategoryArg::Listing => BuiltinCategory::Listing,
            CategoryArg::Mutation => BuiltinCategory::Mutation,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PathsConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PathsConfig::load_from_cwd().context("Failed to load hostpaths.toml")?,
    };
    init_logging(&config, cli.verbose)?;

    let registry = BuiltinRegistry::new(Arc::new(PathBuiltins::from_config(config.clone())));

    match cli.command {
        Commands::Call { name, args } => {
            let succeeded = cmd_call(&registry, &name, &args)?;
            if !succeeded {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Info => cmd_info(&registry, &config),
        Commands::List { category, json } => cmd_list(&registry, category.map(Into::into), json),
    }
}

fn init_logging(config: &PathsConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        config
            .logging
            .level
            .parse::<tracing::Level>()
            .with_context(|| format!("Invalid log level {:?}", config.logging.level))?
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Invoke a builtin and print its result. Returns false for false/absent results.
fn cmd_call(registry: &BuiltinRegistry, name: &str, args: &[String]) -> Result<bool> {
    let entry = registry
        .get_by_name(name)
        .with_context(|| format!("Unknown builtin: {}", name))?;
    let returns = entry.signature.returns;

    if args.len() != entry.signature.arg_count {
        bail!(
            "{} takes {} argument(s), got {}",
            name,
            entry.signature.arg_count,
            args.len()
        );
    }

    let handles: Vec<u64> = args
        .iter()
        .map(|arg| HandleManager::store_buffer(ManagedBuffer::from_str(0, arg)))
        .collect();
    let mut outputs = [0u64; 1];
    let result = registry.call_by_name(name, &handles, &mut outputs);
    for handle in &handles {
        HandleManager::remove(*handle);
    }
    let word = result.with_context(|| format!("Failed to call {}", name))?;

    Ok(print_result(returns, word))
}

fn print_result(returns: ReturnKind, word: i64) -> bool {
    let handle = word as u64;
    match returns {
        ReturnKind::Bool => {
            println!("{}", word != 0);
            word != 0
        }
        ReturnKind::Byte => {
            println!("{}", char::from(word as u8));
            true
        }
        ReturnKind::Buffer | ReturnKind::NullableBuffer => {
            match HandleManager::remove(handle).and_then(|v| v.into_buffer()) {
                Some(buffer) => {
                    println!("{}", String::from_utf8_lossy(buffer.as_slice()));
                    true
                }
                None => {
                    println!("(absent)");
                    false
                }
            }
        }
        ReturnKind::NullableList => match HandleManager::remove(handle).and_then(|v| v.into_list()) {
            Some(list) => {
                for entry in &list {
                    println!("{}", String::from_utf8_lossy(entry.as_slice()));
                }
                true
            }
            None => {
                println!("(absent)");
                false
            }
        },
    }
}

fn cmd_info(registry: &BuiltinRegistry, config: &PathsConfig) -> Result<()> {
    let platform = registry.paths().platform();

    println!("Platform");
    println!("========");
    println!();
    println!("  Separator:      {}", char::from(platform.separator));
    println!("  Drive letters:  {}", platform.has_drive_letters);
    println!("  Builtins:       {}", registry.list().len());
    println!();
    println!("Configuration");
    println!("=============");
    println!();
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", rendered);

    Ok(())
}

#[derive(Serialize)]
struct ListedBuiltin<'a> {
    id: u32,
    #[serde(flatten)]
    signature: &'a BuiltinSignature,
}

fn cmd_list(
    registry: &BuiltinRegistry,
    category: Option<BuiltinCategory>,
    json: bool,
) -> Result<()> {
    let entries = match category {
        Some(category) => registry.list_by_category(category),
        None => registry.list(),
    };

    if json {
        let listed: Vec<_> = entries
            .iter()
            .map(|e| ListedBuiltin {
                id: e.id,
                signature: &e.signature,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    println!(
        "{:<4} {:<24} {:<5} {:<8} {:<9}",
        "ID", "NAME", "ARGS", "RETURNS", "CATEGORY"
    );
    println!("{:-<4} {:-<24} {:-<5} {:-<8} {:-<9}", "", "", "", "", "");

    for entry in entries {
        let sig = &entry.signature;
        println!(
            "{:<4} {:<24} {:<5} {:<8} {:<9}",
            entry.id,
            sig.name,
            sig.arg_count,
            sig.returns.to_string(),
            sig.category.to_string()
        );
    }

    Ok(())
}
