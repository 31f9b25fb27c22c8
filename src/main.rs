//! Storage Cache - operator CLI
//!
//! Inspects and maintains a file-backed cache directory shared by several
//! processes.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storage_cache::{
    spawn_sweep_task, CacheKey, Config, FileBackend, GetOptions, PersistentCache, SetOptions,
};

const USAGE: &str = "usage: storage_cache <command>

commands:
  get <key>                   print the live value of <key>
  set <key> <json> [ttl_secs] store a JSON value
  rm <key>                    delete <key>
  info <key>                  size and quota figures for <key>
  export                      dump every live entry in the namespace
  backup <key>                print the raw stored payload
  restore <key> <payload>     write a raw payload back
  sweep                       delete every expired entry once
  watch                       sweep on an interval until interrupted";

/// Entry point for the cache CLI.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the file backend in the configured directory
/// 4. Run the requested command
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storage_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: namespace={}, capacity={}, default_ttl={}s, sweep_interval={}s, dir={}",
        config.namespace,
        config.capacity,
        config.default_ttl,
        config.sweep_interval,
        config.storage_dir.display()
    );

    let backend = FileBackend::open(&config.storage_dir, Some(config.capacity))
        .with_context(|| format!("opening {}", config.storage_dir.display()))?;
    let mut cache = PersistentCache::new(Arc::new(backend), config.clone()).with_error_callback(
        |key: &CacheKey, err| warn!(key = %key, "write failed: {}", err),
    );

    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["get", name] => {
            let key = cache.key(name);
            if !cache.has_value(&key) {
                bail!("{} not found", key);
            }
            let binding = cache.get(&key, serde_json::Value::Null, GetOptions::default());
            println!("{}", serde_json::to_string_pretty(&cache.value(&binding))?);
        }
        ["set", name, json, rest @ ..] => {
            let key = cache.key(name);
            let value: serde_json::Value =
                serde_json::from_str(json).with_context(|| format!("parsing value for {}", key))?;
            let mut options = SetOptions::new();
            if let [ttl] = rest {
                let secs: u64 = ttl.parse().context("ttl must be whole seconds")?;
                options = options.ttl(Duration::from_secs(secs));
            }
            cache.set(&key, &value, options)?;
            println!("Key '{}' set successfully", key);
        }
        ["rm", name] => {
            let key = cache.key(name);
            cache.remove(&key);
            println!("Key '{}' deleted", key);
        }
        ["info", name] => {
            let info = cache.storage_info(&cache.key(name));
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        ["export"] => {
            println!("{}", serde_json::to_string_pretty(&cache.export_all())?);
        }
        ["backup", name] => {
            let key = cache.key(name);
            match cache.backup(&key) {
                Some(raw) => println!("{}", raw),
                None => bail!("{} not found", key),
            }
        }
        ["restore", name, payload] => {
            let key = cache.key(name);
            cache.restore(&key, payload)?;
            println!("Key '{}' restored", key);
        }
        ["sweep"] => {
            let removed = cache.sweep_expired();
            println!("Removed {} expired entries", removed);
        }
        ["watch"] => {
            let cache = Arc::new(Mutex::new(cache));
            let sweep_handle = spawn_sweep_task(cache, config.sweep_interval);
            info!("Background sweep task started");
            shutdown_signal(sweep_handle).await;
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("unrecognized command");
        }
    }

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweep task.
async fn shutdown_signal(sweep_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweep_handle.abort();
    warn!("Sweep task aborted");
}
