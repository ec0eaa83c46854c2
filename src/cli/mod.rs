//! CLI Module
//!
//! Command-line helpers for the velomux binary.

use crate::config::Config;
use crate::mux::Router;

use anyhow::{anyhow, Result};
use clap::Subcommand;
use std::path::Path;

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Validate configuration file
    Validate,
    /// Test configuration and show parsed result
    Test,
    /// Show default configuration
    ShowDefault,
}

pub const DEFAULT_CONFIG: &str = r#"# velomux configuration

[server]
listen = "0.0.0.0:8080"
workers = "auto"
# TCP keep-alive period in seconds, 0 disables it
tcp_keepalive = 180
max_body_size = "10M"
debug = false

# [static_files]
# prefix = "/static"
# root = "./public"
"#;

/// Load `path` if it exists, the defaults otherwise.
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Ok(Config::load(path)?)
    } else {
        Ok(Config::default())
    }
}

/// Handle configuration commands
pub fn handle_config_command(config_path: &Path, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Validate => {
            println!("Validating configuration: {:?}", config_path);
            if !config_path.exists() {
                println!("Configuration file not found, using defaults.");
                println!("Configuration is valid.");
                return Ok(());
            }

            match Config::load(config_path) {
                Ok(_) => {
                    println!("✓ Configuration is valid.");
                }
                Err(e) => {
                    println!("✗ Configuration error: {}", e);
                    return Err(anyhow!("Invalid configuration"));
                }
            }
        }
        ConfigCommand::Test => {
            println!("Testing configuration: {:?}", config_path);
            if !config_path.exists() {
                println!("(Using default configuration)");
            }
            let config = load_config(config_path)?;

            println!("\n=== Parsed Configuration ===\n");
            println!("[server]");
            println!("  listen: {}", config.server.listen);
            println!(
                "  workers: {} ({} threads)",
                config.server.workers,
                config.worker_threads()
            );
            match config.server.tcp_keepalive() {
                Some(period) => println!("  tcp_keepalive: {:?}", period),
                None => println!("  tcp_keepalive: disabled"),
            }
            println!(
                "  max_body_size: {} ({} bytes)",
                config.server.max_body_size,
                config.server.max_body_size_bytes()?
            );
            println!("  debug: {}", config.server.debug);

            if let Some(ref files) = config.static_files {
                println!("\n[static_files]");
                println!("  prefix: {}", files.prefix);
                println!("  root: {}", files.root);
            }

            println!("\n✓ Configuration test passed.");
        }
        ConfigCommand::ShowDefault => {
            println!("{}", DEFAULT_CONFIG);
        }
    }
    Ok(())
}

/// Print the route table: name, method, pattern.
pub fn print_routes<H>(router: &Router<H>) {
    let width = router.routes().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, route) in router.routes() {
        println!(
            "{:<width$}  {:<7}  {}",
            name,
            route.method.as_str(),
            route.pattern,
            width = width
        );
    }
}
