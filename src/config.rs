use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LOG_FILTER: &str = "rollbookd=info";

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "rollbookd", version, about = "Classroom records sidecar (JSON lines over stdio)")]
pub struct Args {
    /// TOML config file
    #[arg(long, env = "ROLLBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Open a SQLite workspace directory at startup
    #[arg(long, env = "ROLLBOOK_WORKSPACE", conflicts_with_all = ["mock", "remote_url"])]
    pub workspace: Option<PathBuf>,

    /// Start with the in-memory mock store
    #[arg(long, env = "ROLLBOOK_MOCK", conflicts_with = "remote_url")]
    pub mock: bool,

    /// Start the mock store empty instead of with the demo roster
    #[arg(long, env = "ROLLBOOK_NO_SEED")]
    pub no_seed: bool,

    /// Base URL of a remote record API
    #[arg(long, env = "ROLLBOOK_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Bearer key sent to the remote record API
    #[arg(long, env = "ROLLBOOK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// tracing filter, e.g. "rollbookd=debug"
    #[arg(long, env = "ROLLBOOK_LOG")]
    pub log: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    None,
    Mock,
    Sqlite,
    Remote,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub store: StoreSection,
    pub remote: RemoteSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: BackendKind,
    pub workspace: Option<PathBuf>,
    pub seed: bool,
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            backend: BackendKind::None,
            workspace: None,
            seed: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RemoteSection {
    fn default() -> Self {
        RemoteSection {
            base_url: None,
            api_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendConfig {
    /// Wait for a `workspace.*` request.
    Deferred,
    Mock { seed: bool },
    Sqlite { workspace: PathBuf },
    Remote {
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: BackendConfig,
    pub remote_timeout: Duration,
    pub log_filter: String,
}

pub fn load_file(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
}

impl Config {
    pub fn load(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => load_file(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file)
    }

    /// Command-line values win over file values.
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self> {
        let remote_timeout = Duration::from_secs(file.remote.timeout_secs.max(1));
        let log_filter = args
            .log
            .clone()
            .or(file.log.filter)
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let backend = if let Some(workspace) = &args.workspace {
            BackendConfig::Sqlite {
                workspace: workspace.clone(),
            }
        } else if args.mock {
            BackendConfig::Mock {
                seed: !args.no_seed && file.store.seed,
            }
        } else if let Some(url) = &args.remote_url {
            BackendConfig::Remote {
                base_url: url.clone(),
                api_key: args.api_key.clone().or(file.remote.api_key),
                timeout: remote_timeout,
            }
        } else {
            match file.store.backend {
                BackendKind::None => BackendConfig::Deferred,
                BackendKind::Mock => BackendConfig::Mock {
                    seed: !args.no_seed && file.store.seed,
                },
                BackendKind::Sqlite => {
                    let Some(workspace) = file.store.workspace else {
                        bail!("store.backend = \"sqlite\" needs store.workspace");
                    };
                    BackendConfig::Sqlite { workspace }
                }
                BackendKind::Remote => {
                    let Some(base_url) = file.remote.base_url else {
                        bail!("store.backend = \"remote\" needs remote.base_url");
                    };
                    BackendConfig::Remote {
                        base_url,
                        api_key: args.api_key.clone().or(file.remote.api_key),
                        timeout: remote_timeout,
                    }
                }
            }
        };

        Ok(Config {
            backend,
            remote_timeout,
            log_filter,
        })
    }
}
