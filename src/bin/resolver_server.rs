//! Restaurant resolver gRPC server
//!
//! A standalone server binary exposing the resolver over gRPC, backed by a
//! SQLite database.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::signal;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

use restaurant_resolver::engine::ResolverEngine;
use restaurant_resolver::storage::{RecordStore, SqliteConfig, SqliteStores};
use restaurant_resolver::transport::ResolverServiceImpl;
use restaurant_resolver::ResolverConfig;

/// Server configuration
struct Config {
    /// Address to bind to
    addr: SocketAddr,
    /// SQLite database file
    db_path: PathBuf,
    /// Resolver settings
    resolver: ResolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 30235)),
            db_path: PathBuf::from("./restaurants.db"),
            resolver: ResolverConfig::default(),
        }
    }
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    if let Some(value) = args.get(i + 1) {
        value
    } else {
        eprintln!("error: {flag} requires a value");
        std::process::exit(1);
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("error: invalid {what}: {value}");
        std::process::exit(1);
    })
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                let port: u16 = parse_number(value_of(&args, i, "--port"), "port number");
                config.addr.set_port(port);
                i += 2;
            }
            "--db" | "-d" => {
                config.db_path = PathBuf::from(value_of(&args, i, "--db"));
                i += 2;
            }
            "--scaling" | "-s" => {
                config.resolver.scaled = true;
                i += 1;
            }
            "--blocks" | "-b" => {
                config.resolver.block_count = parse_number(value_of(&args, i, "--blocks"), "block count");
                i += 2;
            }
            "--workers" | "-w" => {
                config.resolver.linkage_workers =
                    parse_number(value_of(&args, i, "--workers"), "worker count");
                i += 2;
            }
            "--help" | "-h" => {
                println!("resolver-server - restaurant resolver gRPC server");
                println!();
                println!("USAGE:");
                println!("    resolver-server [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -p, --port <PORT>         Port to listen on [default: 30235]");
                println!("    -d, --db <FILE>           SQLite database [default: ./restaurants.db]");
                println!("    -s, --scaling             Run blocked resolution passes by default");
                println!("    -b, --blocks <N>          Alphabet blocks per blocked pass [default: 4]");
                println!("    -w, --workers <N>         Block linkage threads [default: 1]");
                println!("    -h, --help                Print help information");
                println!();
                println!("Log filtering follows RUST_LOG [default: info].");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), db = %config.db_path.display(), "opening database");
    let store: Arc<dyn RecordStore> =
        Arc::new(SqliteStores::open_with(&SqliteConfig::new(config.db_path.clone()))?);
    let engine = Arc::new(ResolverEngine::with_config(store, config.resolver)?);

    let svc = ResolverServiceImpl::new(engine).into_server();

    info!(addr = %config.addr, "starting gRPC server");
    Server::builder()
        .add_service(svc)
        .serve_with_shutdown(config.addr, async {
            let _ = signal::ctrl_c().await;
        })
        .await?;

    info!("shut down");
    Ok(())
}
