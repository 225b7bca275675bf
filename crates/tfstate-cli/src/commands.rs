use anyhow::Context;
use tfstate_server::{DumpEntry, StateServer};
use tfstate_store::{SqliteStateStore, StateSchema, StateStore};
use tfstate_types::{Credentials, StateId};

use crate::cli::{Cli, Command, FingerprintArgs};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        None | Some(Command::Serve) => cmd_serve(&cli).await,
        Some(Command::Dump) => cmd_dump(&cli),
        Some(Command::Fingerprint(args)) => cmd_fingerprint(args),
    }
}

async fn cmd_serve(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.server_config();
    let server = StateServer::open(config.clone())
        .with_context(|| format!("failed to open database {}", config.database.display()))?;
    server
        .serve()
        .await
        .with_context(|| format!("server on {} failed", config.bind_addr))
}

fn cmd_dump(cli: &Cli) -> anyhow::Result<()> {
    let store = SqliteStateStore::open(&cli.database, StateSchema::default())
        .with_context(|| format!("failed to open database {}", cli.database.display()))?;
    let rows: Vec<DumpEntry> = store.scan()?.into_iter().map(DumpEntry::from).collect();
    tracing::debug!(rows = rows.len(), "dumping state table");
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn cmd_fingerprint(args: &FingerprintArgs) -> anyhow::Result<()> {
    let credentials = Credentials::new(args.username.as_str(), args.password.as_str());
    println!("{}", StateId::fingerprint(&args.path, &credentials));
    Ok(())
}
