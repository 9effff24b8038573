//! CLI configuration utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use todo_http::ClientConfig;

/// Name of the config file looked up in the data directory
const CONFIG_FILE: &str = "config.toml";

/// Load client configuration from an explicit file, or `<data_dir>/config.toml` if present
pub fn load_client_config(explicit: Option<&Path>, data_dir: &Path) -> Result<ClientConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| Some(data_dir.join(CONFIG_FILE)).filter(|p| p.exists()));

    ClientConfig::load(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("loading configuration from {}", path.display()),
        None => "loading configuration from environment".to_string(),
    })
}

/// Location of the persisted credentials
pub fn credentials_path(data_dir: &Path) -> PathBuf {
    data_dir.join("credentials.json")
}

/// Write a commented default configuration file
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let defaults = ClientConfig::default();
    let content = format!(
        "# todo client configuration\n\
         # Every key can be overridden with TODO__<KEY>, e.g. TODO__BASE_URL\n\
         base_url = \"{}\"\n\
         timeout_secs = {}\n\
         \n\
         [credentials]\n\
         access_token_key = \"{}\"\n\
         refresh_token_key = \"{}\"\n\
         session_key = \"{}\"\n\
         path = \"{}\"\n\
         max_age_days = {}\n",
        defaults.base_url,
        defaults.timeout_secs,
        defaults.credentials.access_token_key,
        defaults.credentials.refresh_token_key,
        defaults.credentials.session_key,
        defaults.credentials.path,
        defaults.credentials.max_age_days,
    );

    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
