use std::sync::Arc;

use weave_memorystore::{MemoryStore, MemoryStoreConfig};
use weave_sqlitestore::{SqliteStore, SqliteStoreConfig};
use weave_storehttp::{HttpConfig, SharedAdapter, StoreHttpServer};

use crate::cli::{Backend, BackendArgs, Cli, Command, InfoArgs, ServeArgs};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => serve(args),
        Command::Info(args) => info(args),
    }
}

fn open_adapter(args: &BackendArgs) -> anyhow::Result<SharedAdapter> {
    let version = env!("CARGO_PKG_VERSION").to_string();
    Ok(match args.backend {
        Backend::Memory => Arc::new(MemoryStore::new(MemoryStoreConfig {
            version,
            commit: String::new(),
        })),
        Backend::Sqlite => Arc::new(SqliteStore::open(SqliteStoreConfig {
            path: args.db.clone(),
            version,
            commit: String::new(),
        })?),
    })
}

fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let adapter = open_adapter(&args.backend)?;
    let server = StoreHttpServer::new(HttpConfig { bind_addr: args.addr }, adapter);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn info(args: InfoArgs) -> anyhow::Result<()> {
    let adapter = open_adapter(&args.backend)?;
    let info = adapter.get_info()?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
