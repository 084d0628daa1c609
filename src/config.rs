use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::dedup::DEFAULT_CAPACITY;

/// Delay before reconnecting a server stream after it fails or closes.
pub const DEFAULT_RECONNECT_SECS: u64 = 30;
/// Connect timeout for server streams.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Interval between followed-tag refreshes.
pub const DEFAULT_TAG_REFRESH_SECS: u64 = 5 * 60;
/// Interval between stats reports.
pub const DEFAULT_STATS_SECS: u64 = 5 * 60;
/// Overall timeout of followed_tags and search requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5 * 60;

/// Runtime configuration loaded from environment variables.
///
/// Every value has a default, so an empty environment is valid. The .env
/// file is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
    pub tag_refresh_interval: Duration,
    pub stats_interval: Duration,
    pub request_timeout: Duration,
    pub dedup_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            tag_refresh_interval: Duration::from_secs(DEFAULT_TAG_REFRESH_SECS),
            stats_interval: Duration::from_secs(DEFAULT_STATS_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            dedup_capacity: DEFAULT_CAPACITY,
        }
    }
}

fn positive_var(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(raw) => {
            let value: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{name} must be a whole number, got {raw:?}"))?;
            if value == 0 {
                anyhow::bail!("{name} must be greater than zero");
            }
            Ok(value)
        }
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn load() -> Result<Self> {
        let secs = |name, default| positive_var(name, default).map(Duration::from_secs);

        Ok(Self {
            reconnect_delay: secs("TAGFINDER_RECONNECT_SECS", DEFAULT_RECONNECT_SECS)?,
            connect_timeout: secs("TAGFINDER_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
            tag_refresh_interval: secs("TAGFINDER_TAG_REFRESH_SECS", DEFAULT_TAG_REFRESH_SECS)?,
            stats_interval: secs("TAGFINDER_STATS_SECS", DEFAULT_STATS_SECS)?,
            request_timeout: secs("TAGFINDER_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            dedup_capacity: positive_var("TAGFINDER_DEDUP_CAPACITY", DEFAULT_CAPACITY as u64)?
                as usize,
        })
    }
}

/// Base URL for a configured server.
///
/// Bare host names get `https://`; entries that already carry a scheme are
/// used as given.
pub fn server_url(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.contains("://") {
        server.to_string()
    } else {
        format!("https://{server}")
    }
}

/// A user whose home feed receives matched posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub server: String,
    pub token: String,
}

/// Parse a server list: one host per line, blank lines ignored.
pub fn parse_servers(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a user list: `server,access_token` per line, blank lines ignored.
pub fn parse_users(text: &str) -> Result<Vec<UserEntry>> {
    let mut users = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((server, token)) = line.split_once(',') else {
            anyhow::bail!("User list line {}: expected \"server,access_token\"", index + 1);
        };
        let (server, token) = (server.trim(), token.trim());
        if server.is_empty() || token.is_empty() {
            anyhow::bail!("User list line {}: server and access token must not be empty", index + 1);
        }
        users.push(UserEntry {
            server: server.to_string(),
            token: token.to_string(),
        });
    }
    Ok(users)
}

pub fn load_servers(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read server list {}", path.display()))?;
    Ok(parse_servers(&text))
}

pub fn load_users(path: &Path) -> Result<Vec<UserEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read user list {}", path.display()))?;
    parse_users(&text).with_context(|| format!("Invalid user list {}", path.display()))
}
