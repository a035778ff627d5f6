//! Runtime configuration for the presence bridge.
//!
//! Everything is read from environment variables once, when the engine is
//! built. Unparseable values fall back to defaults rather than failing; the
//! bridge is a side channel and should come up with sane behavior no matter
//! what the host environment looks like.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ASSET_BASE_URL: &str =
    "https://raw.githubusercontent.com/reblast/cord.nvim/master/assets";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 2000;

const SOCKET_ENV: &str = "CORD_IPC_SOCKET";
const CONNECT_TIMEOUT_ENV: &str = "CORD_CONNECT_TIMEOUT_SECS";
const RESPONSE_TIMEOUT_ENV: &str = "CORD_RESPONSE_TIMEOUT_MS";
const ASSET_BASE_ENV: &str = "CORD_ASSET_BASE_URL";
const LOG_DIR_ENV: &str = "CORD_LOG_DIR";
const DEBUG_LOG_ENV: &str = "CORD_DEBUG_LOG";
const LOG_FILTER_ENV: &str = "CORD_LOG";

const SOCKET_PREFIX: &str = "discord-ipc-";
const SOCKET_SLOTS: usize = 10;
const RUNTIME_DIR_ENVS: [&str; 4] = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"];
const SANDBOX_SUBDIRS: [&str; 2] = ["app/com.discordapp.Discord", "snap.discord"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceConfig {
    /// Explicit socket path; skips discovery when set.
    pub socket_override: Option<PathBuf>,
    /// Hard bound on connect plus handshake.
    pub connect_timeout: Duration,
    /// How long to wait for the acknowledgement of a command.
    pub response_timeout: Duration,
    pub asset_base_url: String,
    pub log_dir: Option<PathBuf>,
    /// `EnvFilter` directive for file logging; `None` keeps logging off.
    pub log_filter: Option<String>,
    runtime_dirs: Vec<PathBuf>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            socket_override: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            asset_base_url: DEFAULT_ASSET_BASE_URL.to_string(),
            log_dir: default_log_dir(),
            log_filter: None,
            runtime_dirs: vec![PathBuf::from("/tmp")],
        }
    }
}

impl PresenceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.socket_override = non_empty(SOCKET_ENV).map(PathBuf::from);

        if let Some(secs) = non_empty(CONNECT_TIMEOUT_ENV).and_then(|v| v.trim().parse().ok()) {
            if secs > 0 {
                config.connect_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(ms) = non_empty(RESPONSE_TIMEOUT_ENV).and_then(|v| v.trim().parse().ok()) {
            if ms > 0 {
                config.response_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(base) = non_empty(ASSET_BASE_ENV) {
            config.asset_base_url = base.trim().trim_end_matches('/').to_string();
        }

        if let Some(dir) = non_empty(LOG_DIR_ENV) {
            config.log_dir = Some(PathBuf::from(dir));
        }

        let debug_enabled = lookup(DEBUG_LOG_ENV)
            .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
            .unwrap_or(false);
        config.log_filter = if debug_enabled {
            Some("debug".to_string())
        } else {
            non_empty(LOG_FILTER_ENV)
        };

        let mut runtime_dirs: Vec<PathBuf> = Vec::new();
        let discovered = RUNTIME_DIR_ENVS
            .iter()
            .filter_map(|key| non_empty(*key))
            .map(PathBuf::from)
            .chain(std::iter::once(PathBuf::from("/tmp")));
        for dir in discovered {
            if !runtime_dirs.contains(&dir) {
                runtime_dirs.push(dir);
            }
        }
        config.runtime_dirs = runtime_dirs;

        config
    }

    /// Socket paths to try, in order.
    pub fn socket_candidates(&self) -> Vec<PathBuf> {
        if let Some(path) = &self.socket_override {
            return vec![path.clone()];
        }

        let mut candidates = Vec::new();
        for dir in &self.runtime_dirs {
            let mut bases = vec![dir.clone()];
            bases.extend(SANDBOX_SUBDIRS.iter().map(|sub| dir.join(sub)));
            for base in bases {
                for slot in 0..SOCKET_SLOTS {
                    candidates.push(base.join(format!("{}{}", SOCKET_PREFIX, slot)));
                }
            }
        }
        candidates
    }
}

fn default_log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cord").join("logs"))
}
