//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a served
//! site. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for a site, immutable after startup.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// Display name of the site.
    pub title: String,

    /// Canonical URL prefix under which the whole site is served.
    /// May be written with or without surrounding slashes; it is stored
    /// normalized and reattached with a leading slash at the wire boundary.
    pub base_path: String,

    /// Listening TCP port.
    pub port: u16,

    /// Ordered redirect rewrites, applied cumulatively in list order.
    pub redirects: Vec<RedirectRule>,

    /// Websocket keepalive settings.
    pub streaming: StreamingConfig,

    /// Logical library name -> filesystem path, consumed only by the API
    /// bundle at load time.
    pub native_library_mappings: HashMap<String, PathBuf>,

    /// Content roots for each server environment.
    pub paths: SitePathsByEnv,
}

impl SiteConfig {
    /// Paths for the given environment.
    pub fn paths_for(&self, env: ServerEnvironment) -> &SitePaths {
        match env {
            ServerEnvironment::Dev => &self.paths.dev,
            ServerEnvironment::Prod => &self.paths.prod,
        }
    }
}

/// A single redirect rewrite rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedirectRule {
    /// Regex matched against the full canonical path, anchored at both ends.
    pub from: String,

    /// Replacement template; `$1`..`$9` reference capture groups.
    pub to: String,
}

/// Websocket keepalive configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Interval between server pings in milliseconds. `0` disables pings.
    pub ping_period_ms: u64,

    /// Maximum time a websocket write (including pings) may take before the
    /// session is closed, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            ping_period_ms: 30_000,
            timeout_ms: 15_000,
        }
    }
}

impl StreamingConfig {
    pub fn ping_period(&self) -> Duration {
        Duration::from_millis(self.ping_period_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn pings_enabled(&self) -> bool {
        self.ping_period_ms > 0
    }
}

/// Content roots for the dev and prod environments.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SitePathsByEnv {
    pub dev: SitePaths,
    pub prod: SitePaths,
}

/// Filesystem layout consumed at runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SitePaths {
    /// Root directory holding built page content; served by the dev extra
    /// handler and as the home of the index fallback file.
    pub content_root: PathBuf,

    /// Compiled client-side script bundle.
    pub script: PathBuf,

    /// Optional server-side API bundle.
    pub api_bundle: Option<PathBuf>,

    /// Exported site root (prod layouts).
    pub site_root: PathBuf,
}

impl Default for SitePaths {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("build"),
            script: PathBuf::from("build/site.js"),
            api_bundle: None,
            site_root: PathBuf::from("site"),
        }
    }
}

/// Which mode the server runs in. Selected at startup, never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerEnvironment {
    Dev,
    Prod,
}

/// Whether the site carries server-side dynamic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteLayout {
    Fullstack,
    Static,
}
