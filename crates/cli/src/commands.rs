//! CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use todo_core::{CredentialStore, FileStore};
use todo_http::{ApiRequest, ApiResponse, TodoClient};
use tracing::info;

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session tokens
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a new account
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show the signed-in user
    Me,

    /// Send an authenticated GET request and print the response body
    Get {
        /// API path, e.g. /todos
        path: String,
    },

    /// Sign out and forget the stored tokens
    Logout,

    /// Write a default configuration file
    Config {
        /// Output file path (defaults to <data-dir>/config.toml)
        output: Option<PathBuf>,
    },
}

impl Commands {
    pub async fn execute(self, data_dir: PathBuf, config_file: Option<PathBuf>) -> Result<()> {
        let client = || build_client(&data_dir, config_file.as_deref());

        match self {
            Commands::Login { email, password } => {
                let session = client()?.sign_in(&email, &password).await?;
                println!("Signed in as {} <{}>", session.name, session.email);
            }
            Commands::Register {
                name,
                email,
                password,
            } => {
                let created = client()?.register(&name, &email, &password).await?;
                println!("{}", serde_json::to_string_pretty(&created)?);
            }
            Commands::Me => match client()?.bootstrap().await? {
                Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
                None => println!("Not signed in"),
            },
            Commands::Get { path } => {
                let response = client()?.send(ApiRequest::get(path)).await?;
                println!("{}", render(&response));
            }
            Commands::Logout => {
                client()?.sign_out();
                println!("Signed out");
            }
            Commands::Config { output } => {
                let path = output.unwrap_or_else(|| data_dir.join("config.toml"));
                config::generate_default_config(&path)?;
                println!("Generated configuration at: {}", path.display());
            }
        }

        Ok(())
    }
}

fn build_client(data_dir: &Path, config_file: Option<&Path>) -> Result<TodoClient> {
    let client_config = config::load_client_config(config_file, data_dir)?;
    let credentials = config::credentials_path(data_dir);
    let store: Arc<dyn CredentialStore> = Arc::new(
        FileStore::open(&credentials)
            .with_context(|| format!("opening credential store {}", credentials.display()))?,
    );

    info!(base_url = %client_config.base_url, "Using API");
    Ok(TodoClient::builder()
        .config(client_config)
        .store(store)
        .build()?)
}

/// Pretty-print JSON bodies, pass anything else through
fn render(response: &ApiResponse) -> String {
    match response.json::<serde_json::Value>() {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.text()),
        Err(_) => response.text(),
    }
}
