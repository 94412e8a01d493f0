use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "weave",
    about = "Weave — append-only, content-addressed segment ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve a store backend over HTTP
    Serve(ServeArgs),
    /// Print a store backend's information block
    Info(InfoArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub addr: SocketAddr,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args)]
pub struct BackendArgs {
    /// Storage backend
    #[arg(long, value_enum, default_value = "memory")]
    pub backend: Backend,

    /// SQLite database file; the sqlite backend runs in memory when omitted
    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Backend {
    Memory,
    Sqlite,
}
