//! Everything a command needs: effective configuration, the assembled engine
//! and user records read from disk.

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use lectern_core::config::Config;
use lectern_core::rbac::{InMemoryUserStore, User, UserLoader, UserStore};
use lectern_core::AccessEngine;

pub struct Context {
    pub config: Config,
    pub engine: AccessEngine,
}

impl Context {
    /// Load configuration (file or environment), apply the `--catalog`
    /// override and build the engine. Catalog errors abort the command.
    pub fn load(config_path: Option<&Path>, catalog: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                let path = path.to_str().context("Config path is not valid UTF-8")?;
                Config::from_file(path).with_context(|| format!("Failed to load config {}", path))?
            }
            None => Config::load().context("Failed to load config from environment")?,
        };
        if catalog.is_some() {
            config.catalog.path = catalog;
        }

        let engine = AccessEngine::from_config(&config).context("Failed to load role catalog")?;
        Ok(Self { config, engine })
    }

    /// Read a user record from a JSON file and materialise its permission
    /// cache the same way a storage read would.
    pub async fn load_user(&self, path: &Path) -> Result<User> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let user: User = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse user record {}", path.display()))?;

        let id = user.id().clone();
        let store = InMemoryUserStore::new();
        store.save(user).await?;
        let loader = UserLoader::new(store, self.engine.gate().cache().clone());
        Ok(loader.load_required(&id).await?)
    }
}
