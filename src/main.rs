//! velomux - demo server binary
//!
//! Entry point for the velomux server binary.

use clap::{Parser, Subcommand};
use hyper::StatusCode;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use velomux::cli::{self, ConfigCommand};
use velomux::config::Config;
use velomux::middleware;
use velomux::server::{handler, App};

/// velomux - compressed-trie router and web toolkit
#[derive(Parser)]
#[command(name = "velomux")]
#[command(author = "VeloServe Team")]
#[command(version = velomux::VERSION)]
#[command(about = "Web-serving toolkit with a compressed-trie router", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "velomux.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve,
    /// List the registered routes
    Routes,
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { command }) => cli::handle_config_command(&cli.config, command),
        Some(Commands::Routes) => {
            let config = cli::load_config(&cli.config)?;
            cli::print_routes(build_app(config).router());
            Ok(())
        }
        Some(Commands::Serve) | None => {
            let config = cli::load_config(&cli.config)?;
            init_logging(cli.verbose || config.server.debug);
            serve(config)
        }
    }
}

fn init_logging(debug: bool) {
    let log_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("velomux={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn serve(config: Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()?;

    info!(
        "velomux v{} starting with {} worker threads",
        velomux::VERSION,
        config.worker_threads()
    );

    runtime.block_on(async move {
        let app = build_app(config);
        tokio::select! {
            result = app.serve() => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                Ok(())
            }
        }
    })
}

/// The demo application served by the binary.
fn build_app(config: Config) -> App {
    let mut app = App::with_config(config);
    app.use_middleware(middleware::logger())
        .use_middleware(middleware::recover());

    app.get(
        "index",
        "/",
        handler(|c| {
            Box::pin(async move {
                let hello = c.reverse("hello", &[&"world"]);
                let body = format!(
                    "<h1>velomux {}</h1><p>try <a href=\"{}\">{}</a></p>",
                    velomux::VERSION,
                    hello,
                    hello
                );
                c.html(StatusCode::OK, &body)
            })
        }),
    );
    app.get(
        "health",
        "/health",
        handler(|c| Box::pin(async move { c.json(StatusCode::OK, &json!({"status": "ok"})) })),
    );
    app.get(
        "hello",
        "/hello/:name",
        handler(|c| {
            Box::pin(async move {
                let name = c.param("name").unwrap_or("stranger").to_string();
                c.string(StatusCode::OK, &format!("Hello, {}!", name))
            })
        }),
    );

    app
}
