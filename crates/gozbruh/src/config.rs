//! Bridge configuration.
//!
//! Each value is taken from the environment, else from a one-line file in
//! the config directory (`~/.zbrush/gozbruh`), else from a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gozbruh_sync::{ConnectionConfig, NetworkEndpoint};

use crate::error::{BridgeError, Result};

/// Modeling-host endpoint, `host:port`.
pub const MESH_HOST_ENV: &str = "MAYA_HOST";
/// Sculpting-host endpoint, `host:port`.
pub const SCULPT_HOST_ENV: &str = "ZBRUSH_HOST";
/// Shared directory.
pub const SHARED_DIR_ENV: &str = "SHARED_ZDOCS";

/// Config file names inside the config directory.
pub const MESH_HOST_FILE: &str = "MayaHost";
pub const SCULPT_HOST_FILE: &str = "ZBrushHost";
pub const SHARED_DIR_FILE: &str = "ShareDir";

pub const DEFAULT_MESH_PORT: u16 = 6667;
pub const DEFAULT_SCULPT_PORT: u16 = 6668;

/// Leftover material nodes the modeling host creates per imported object,
/// named `<object>_<suffix>`.
pub const GARBAGE_NODE_SUFFIXES: &[&str] = &[
    "blinn",
    "blinnSG",
    "materialInfo",
    "ZBrushTexture",
    "place2dTexture2",
];

/// Configuration for both sides of the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Where the modeling host listens.
    pub mesh_endpoint: NetworkEndpoint,
    /// Where the sculpting host listens.
    pub sculpt_endpoint: NetworkEndpoint,
    /// Directory both hosts read and write artifacts in.
    pub shared_dir: PathBuf,
    /// Artifact extension, without the dot.
    pub file_extension: String,
    /// Rename a replaced object to `<name>_old` instead of deleting it.
    pub keep_old_on_import: bool,
    /// See [`GARBAGE_NODE_SUFFIXES`].
    pub garbage_node_suffixes: Vec<String>,
    /// Outbound connection timeouts and frame limit.
    pub connection: ConnectionConfig,
    /// Connect timeout for reachability checks.
    pub validate_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mesh_endpoint: NetworkEndpoint::new("", DEFAULT_MESH_PORT),
            sculpt_endpoint: NetworkEndpoint::new("", DEFAULT_SCULPT_PORT),
            shared_dir: default_shared_dir(),
            file_extension: "ma".into(),
            keep_old_on_import: false,
            garbage_node_suffixes: GARBAGE_NODE_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            connection: ConnectionConfig::default(),
            validate_timeout: Duration::from_secs(1),
        }
    }
}

impl BridgeConfig {
    /// Resolve from the process environment and the default config
    /// directory.
    pub fn resolve() -> Result<Self> {
        let config_dir = default_config_dir();
        Self::from_sources(|key| std::env::var(key).ok(), config_dir.as_deref())
    }

    /// Resolve from an environment lookup and an optional config directory.
    pub fn from_sources<E>(env: E, config_dir: Option<&Path>) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let lookup = |env_key: &str, file: &str| -> Option<String> {
            env(env_key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .or_else(|| config_dir.and_then(|dir| read_config_file(&dir.join(file))))
        };

        let mut config = Self::default();
        if let Some(value) = lookup(MESH_HOST_ENV, MESH_HOST_FILE) {
            config.mesh_endpoint = parse_endpoint(MESH_HOST_ENV, &value)?;
        }
        if let Some(value) = lookup(SCULPT_HOST_ENV, SCULPT_HOST_FILE) {
            config.sculpt_endpoint = parse_endpoint(SCULPT_HOST_ENV, &value)?;
        }
        if let Some(value) = lookup(SHARED_DIR_ENV, SHARED_DIR_FILE) {
            config.shared_dir = PathBuf::from(value);
        }
        Ok(config)
    }

    /// Write one file per setting into `dir`, creating it if needed.
    pub fn write_config_files(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(MESH_HOST_FILE), self.mesh_endpoint.to_string())?;
        std::fs::write(dir.join(SCULPT_HOST_FILE), self.sculpt_endpoint.to_string())?;
        std::fs::write(
            dir.join(SHARED_DIR_FILE),
            self.shared_dir.to_string_lossy().as_bytes(),
        )?;
        tracing::info!(dir = %dir.display(), "wrote config files");
        Ok(())
    }
}

fn parse_endpoint(source: &str, value: &str) -> Result<NetworkEndpoint> {
    NetworkEndpoint::parse(value)
        .map_err(|e| BridgeError::Config(format!("{}={:?}: {}", source, value, e)))
}

fn read_config_file(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let value = contents.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

/// `~/.zbrush/gozbruh`.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".zbrush").join("gozbruh"))
}

/// Platform default for the shared directory.
pub fn default_shared_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Users/Shared/Pixologic/gozbruhProjects")
    } else if cfg!(windows) {
        PathBuf::from(r"C:\Users\Public\Pixologic\gozbruhProjects")
    } else {
        default_config_dir()
            .unwrap_or_else(|| PathBuf::from(".zbrush").join("gozbruh"))
            .join("temp")
    }
}
