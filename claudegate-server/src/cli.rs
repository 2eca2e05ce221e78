use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "claudegate",
    about = "Claudegate - OpenAI-compatible gateway for Claude",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, global = true, env = "CLAUDEGATE_CONFIG", help = "Path to config.json")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, default_value = "info", help = "Default log filter (RUST_LOG wins)")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the gateway (default if no command specified)")]
    Serve {
        #[arg(short, long, help = "Port to listen on (overrides config)")]
        port: Option<u16>,

        #[arg(long, help = "Interface to bind (overrides config)")]
        host: Option<String>,
    },

    #[command(about = "Validate the effective configuration and print it with secrets masked")]
    CheckConfig,

    #[command(about = "Write a default config file")]
    InitConfig {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}
