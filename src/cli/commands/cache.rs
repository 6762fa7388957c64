//! Cache command - inspect the shared store.

use crate::cache::{self, ConfigCache};
use crate::cli::CacheAction;
use crate::components::{ComponentKey, PathResolver};
use crate::config::Settings;

/// Run a cache subcommand.
pub async fn run(action: CacheAction, settings: &Settings) -> anyhow::Result<()> {
    match action {
        CacheAction::Get { key } => get(&key, settings).await,
    }
}

async fn get(raw_key: &str, settings: &Settings) -> anyhow::Result<()> {
    let key = ComponentKey::parse(raw_key)?;
    let store = cache::open_store(settings)?;
    let cache = ConfigCache::new(
        store,
        PathResolver::new(&settings.home),
        settings.cache_timeout(),
    );

    match cache.get(&key).await? {
        Some(document) => {
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }
        None => {
            eprintln!("No cached document for {key}");
            std::process::exit(1);
        }
    }
}
