//! idlink HTTP Server
//!
//! A standalone server binary exposing the reconciliation engine over
//! HTTP/JSON.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use idlink::{IdentityEngine, InMemoryContactStore};

/// Server configuration
struct Config {
    /// Address to bind to
    addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".parse().unwrap(),
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    let port: u16 = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("error: invalid port number: {}", args[i + 1]);
                        std::process::exit(1);
                    });
                    config.addr.set_port(port);
                    i += 2;
                } else {
                    eprintln!("error: --port requires a value");
                    std::process::exit(1);
                }
            }
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.addr = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("error: invalid bind address: {}", args[i + 1]);
                        std::process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("error: --bind requires a value");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                println!("idlink-server - Contact identity reconciliation over HTTP");
                println!();
                println!("USAGE:");
                println!("    idlink-server [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -p, --port <PORT>         Port to listen on [default: 3000]");
                println!("    -b, --bind <ADDR>         Socket address to bind [default: 127.0.0.1:3000]");
                println!("    -h, --help                Print help information");
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

    let store = Arc::new(InMemoryContactStore::new());
    let engine = Arc::new(IdentityEngine::new(store));
    let app = idlink::transport::router(engine);

    println!("idlink server v{}", env!("CARGO_PKG_VERSION"));
    println!("Listening on http://{}", config.addr);
    println!("Press Ctrl+C to stop");

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await?;

    println!("Shut down");
    Ok(())
}
