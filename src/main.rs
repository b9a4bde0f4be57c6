//! Tiercache CLI
//!
//! Builds a cache hierarchy from flags or a YAML file, replays a list of
//! operations against it and prints the resulting level contents.
//!
//! ```text
//! tiercache --level 3:LRU --level 2:LFU put:A=1 put:B=2 get:A remove-level:2
//! ```
//!
//! With no operations the classic demo sequence is replayed.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tiercache::{CacheConfig, LevelConfig, LevelSnapshot, MultilevelCache, PromotionMode};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Tiercache - tiered in-process key-value cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML hierarchy configuration (overrides --level/--promotion)
    #[arg(long, env = "TIERCACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Level as <capacity>:<POLICY>, fastest first; repeatable
    #[arg(long = "level", value_name = "CAP:POLICY")]
    levels: Vec<LevelConfig>,

    /// Promotion mode (cold, warm)
    #[arg(long, env = "TIERCACHE_PROMOTION", default_value = "cold")]
    promotion: PromotionMode,

    /// Print the final dump as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Operations: put:KEY=VALUE, get:KEY, add-level:CAP:POLICY, remove-level:N
    #[arg(value_name = "OP")]
    ops: Vec<Operation>,
}

/// One scripted cache operation
#[derive(Debug, Clone, PartialEq)]
enum Operation {
    Put { key: String, value: String },
    Get { key: String },
    AddLevel(LevelConfig),
    RemoveLevel(usize),
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verb, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <op>:<args>, got '{}'", s))?;

        match verb {
            "put" => {
                let (key, value) = rest
                    .split_once('=')
                    .ok_or_else(|| format!("expected put:KEY=VALUE, got '{}'", s))?;
                Ok(Operation::Put {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
            "get" => Ok(Operation::Get {
                key: rest.to_string(),
            }),
            "add-level" => rest
                .parse()
                .map(Operation::AddLevel)
                .map_err(|e| format!("{}", e)),
            "remove-level" => rest
                .parse()
                .map(Operation::RemoveLevel)
                .map_err(|e| format!("invalid level number '{}': {}", rest, e)),
            other => Err(format!("unknown operation '{}'", other)),
        }
    }
}

/// The reference demo: fill level 1, read A, push D, read C
fn demo_ops() -> Vec<Operation> {
    let put = |k: &str, v: &str| Operation::Put {
        key: k.into(),
        value: v.into(),
    };
    let get = |k: &str| Operation::Get { key: k.into() };
    vec![
        put("A", "1"),
        put("B", "2"),
        put("C", "3"),
        get("A"),
        put("D", "4"),
        get("C"),
    ]
}

// =============================================================================
// Main
// =============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = match &args.config {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if args.levels.is_empty() => CacheConfig {
            promotion: args.promotion,
            ..CacheConfig::default()
        },
        None => CacheConfig {
            levels: args.levels.clone(),
            promotion: args.promotion,
        },
    };

    info!(
        levels = config.levels.len(),
        promotion = %config.promotion,
        "Starting tiercache {}",
        tiercache::VERSION
    );

    let cache = MultilevelCache::from_config(&config).context("building cache hierarchy")?;

    let ops = if args.ops.is_empty() {
        demo_ops()
    } else {
        args.ops.clone()
    };
    for op in &ops {
        run_op(&cache, op);
    }

    let dump = cache.display_cache();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&dump_json(&cache, &dump))?);
    } else {
        for level in &dump {
            println!("{}", level);
        }
    }

    Ok(())
}

fn run_op(cache: &MultilevelCache, op: &Operation) {
    let outcome = match op {
        Operation::Put { key, value } => cache.put(key, value.clone()),
        Operation::Get { key } => match cache.get(key) {
            Ok(hit) => {
                println!("{}", String::from_utf8_lossy(&hit.value));
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                println!("{}: not found", key);
                Ok(())
            }
            Err(e) => Err(e),
        },
        Operation::AddLevel(level) => cache.add_configured_level(level).map(|_| ()),
        Operation::RemoveLevel(level) => cache.remove_cache_level(*level),
    };

    if let Err(e) = outcome {
        error!(?op, "operation failed: {}", e);
    }
}

fn dump_json(cache: &MultilevelCache, dump: &[LevelSnapshot]) -> serde_json::Value {
    let levels: Vec<_> = dump
        .iter()
        .zip(cache.stats())
        .map(|(snapshot, stats)| {
            let entries: serde_json::Map<_, _> = snapshot
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), json!(String::from_utf8_lossy(v))))
                .collect();
            json!({
                "level": snapshot.level,
                "entries": entries,
                "stats": stats,
            })
        })
        .collect();

    json!({
        "levels": levels,
        "metrics": cache.metrics(),
    })
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operations() {
        assert_eq!(
            "put:A=1".parse::<Operation>().unwrap(),
            Operation::Put {
                key: "A".into(),
                value: "1".into()
            }
        );
        assert_eq!(
            "put:empty=".parse::<Operation>().unwrap(),
            Operation::Put {
                key: "empty".into(),
                value: String::new()
            }
        );
        assert_eq!(
            "get:A".parse::<Operation>().unwrap(),
            Operation::Get { key: "A".into() }
        );
        assert_eq!(
            "add-level:4:LFU".parse::<Operation>().unwrap(),
            Operation::AddLevel(LevelConfig::new(4, "LFU"))
        );
        assert_eq!(
            "remove-level:2".parse::<Operation>().unwrap(),
            Operation::RemoveLevel(2)
        );
    }

    #[test]
    fn test_parse_operation_errors() {
        assert!("put".parse::<Operation>().is_err());
        assert!("put:A".parse::<Operation>().is_err());
        assert!("remove-level:x".parse::<Operation>().is_err());
        assert!("evict:A".parse::<Operation>().is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "tiercache",
            "--level",
            "3:LRU",
            "--level",
            "2:LFU",
            "--promotion",
            "warm",
            "put:A=1",
            "get:A",
        ])
        .unwrap();
        assert_eq!(args.levels.len(), 2);
        assert_eq!(args.promotion, PromotionMode::Warm);
        assert_eq!(args.ops.len(), 2);
    }

    #[test]
    fn test_demo_replay() {
        let cache = MultilevelCache::from_config(&CacheConfig::default()).unwrap();
        for op in demo_ops() {
            run_op(&cache, &op);
        }

        let dump = cache.display_cache();
        assert_eq!(dump[0].to_string(), "L1 Cache: A: 1 C: 3 D: 4");
        assert_eq!(dump[1].to_string(), "L2 Cache:");
    }
}
