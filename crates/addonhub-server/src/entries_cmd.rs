//! `addonhub entries ...` subcommands for the locally editable entries file.

use addonhub_core::{EntriesFile, HttpClient, NetworkConfig};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum EntriesAction {
    /// List the ids of all entries
    List,
    /// Import entries from a .json file or a .zip of .json files
    Import { path: PathBuf },
    /// Remove the entry with the given id
    Remove { id: String },
    /// Remove every entry
    Clear,
}

impl EntriesAction {
    fn mutates(&self) -> bool {
        !matches!(self, EntriesAction::List)
    }
}

/// Apply `action` to the entries file at `path`.
///
/// Returns the lines to print.
pub fn apply(path: &Path, action: &EntriesAction) -> anyhow::Result<Vec<String>> {
    let mut file = EntriesFile::open(path)?;
    let output = match action {
        EntriesAction::List => file.ids().into_iter().map(str::to_string).collect(),
        EntriesAction::Import { path: source } => {
            let count = file.import(source)?;
            vec![format!("Imported {} entries", count)]
        }
        EntriesAction::Remove { id } => {
            if !file.remove(id) {
                anyhow::bail!("No entry with id {}", id);
            }
            vec![format!("Removed {}", id)]
        }
        EntriesAction::Clear => {
            let count = file.len();
            file.clear();
            vec![format!("Removed {} entries", count)]
        }
    };

    if action.mutates() {
        file.save()?;
    }
    Ok(output)
}

/// Run an entries subcommand, then tell a server on `port` to reload.
pub async fn run(path: &Path, action: &EntriesAction, port: u16) -> anyhow::Result<()> {
    for line in apply(path, action)? {
        println!("{}", line);
    }
    if action.mutates() {
        notify_server(port).await;
    }
    Ok(())
}

/// Ask a running server to reload its entries. Failure is only logged.
pub async fn notify_server(port: u16) -> bool {
    let url = format!("http://127.0.0.1:{}/update", port);
    let client = match HttpClient::with_timeout(NetworkConfig::NOTIFY_TIMEOUT) {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to create HTTP client: {}", e);
            return false;
        }
    };

    match client.get(&url).await {
        Ok(_) => {
            info!("Notified server at {}", url);
            true
        }
        Err(e) => {
            warn!("Failed to notify server at {}: {}", url, e);
            false
        }
    }
}
