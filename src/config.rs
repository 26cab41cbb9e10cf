use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthMode {
    DenyAll,
    AllowAll,
    List,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "dmr-masterd", about = "DMR/MMDVM master server")]
pub struct Config {
    #[arg(long, env = "DMR_LISTEN", default_value = "0.0.0.0:62031")]
    pub listen: String,

    #[arg(long, env = "DMR_METRICS_LISTEN", default_value = "0.0.0.0:8080")]
    pub metrics_listen: String,

    #[arg(long, value_enum, default_value_t = AuthMode::DenyAll)]
    pub auth_mode: AuthMode,

    /// Path to a `peer_id=password` file, required when `--auth-mode list`.
    /// An empty password accepts any hash for that peer id.
    #[arg(long)]
    pub allow_list: Option<PathBuf>,

    #[arg(long, default_value_t = 10_000)]
    pub maintenance_period_ms: u64,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Parses `--allow-list` into a `peer_id => password` table. Lines are
    /// `peer_id=password`; blank lines and lines starting with `#` are
    /// skipped.
    pub fn load_allow_list(&self) -> Result<HashMap<u32, String>> {
        let path = self
            .allow_list
            .as_ref()
            .context("--allow-list is required when --auth-mode=list")?;
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading allow-list {}", path.display()))?;

        let mut passwords = HashMap::new();
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (id, password) = line
                .split_once('=')
                .with_context(|| format!("{}:{}: expected peer_id=password", path.display(), lineno + 1))?;
            let peer_id: u32 = id
                .trim()
                .parse()
                .with_context(|| format!("{}:{}: invalid peer id {id:?}", path.display(), lineno + 1))?;
            passwords.insert(peer_id, password.trim().to_string());
        }
        Ok(passwords)
    }
}
