//! Live-reload option surface.
//!
//! Option parsing itself (CLI flags, plugin option objects) belongs to the
//! hosting process; this module defines the shape those collaborators fill
//! in, the layered loading (defaults → config file → environment), and the
//! startup validation the hub relies on.

use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options consumed by the live-reload coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadOptions {
    /// Port the notification hub listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host the hub binds to; loopback when unset.
    #[serde(default)]
    pub host: Option<String>,

    /// Inject the reload client into emitted bundles.
    #[serde(default = "default_true")]
    pub client: bool,

    /// Rewrite duplicate-module references to stable paths.
    #[serde(default = "default_true")]
    pub dedupe: bool,

    /// Emit verbose per-pass diagnostics.
    #[serde(default)]
    pub debug: bool,

    /// Base directory the runtime loader resolves modules against.
    #[serde(default = "default_basedir")]
    pub basedir: PathBuf,

    /// TLS certificate file, for hosts terminating TLS in front of the hub.
    #[serde(default)]
    pub ssl_cert: Option<PathBuf>,

    /// TLS key file; must be paired with `ssl_cert`.
    #[serde(default)]
    pub ssl_key: Option<PathBuf>,

    /// Identifier for this bundle pipeline on the shared hub.
    #[serde(default = "default_bundle_id")]
    pub bundle_id: String,

    /// Bundle ids built by external processes that report into this hub.
    #[serde(default)]
    pub external_entries: Vec<String>,

    /// Run the hub in-process; disable when an external hub is used.
    #[serde(default = "default_true")]
    pub server: bool,
}

impl Default for ReloadOptions {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: None,
            client: true,
            dedupe: true,
            debug: false,
            basedir: default_basedir(),
            ssl_cert: None,
            ssl_key: None,
            bundle_id: default_bundle_id(),
            external_entries: Vec::new(),
            server: true,
        }
    }
}

/// A validated TLS certificate/key pair, by file path.
///
/// Loading the files and terminating TLS is the hosting process's job;
/// relume only guarantees the pair is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl ReloadOptions {
    /// Load options from layered sources.
    /// Priority: environment variables > config file > defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = config_path.map(|p| p.to_path_buf()).or_else(|| {
            let default_path = Path::new("relume.config.json");
            default_path.exists().then(|| default_path.to_path_buf())
        });

        if let Some(path) = config_file {
            figment = figment.merge(Json::file(path));
        }

        figment = figment.merge(Env::prefixed("RELUME_"));

        let options: Self = figment.extract()?;
        options.validate()?;
        Ok(options)
    }

    /// Check invariants the rest of the system assumes.
    ///
    /// A half-configured TLS pair is a startup-fatal error: the hub refuses
    /// to start rather than silently serving plaintext.
    pub fn validate(&self) -> Result<()> {
        if self.bundle_id.is_empty() {
            return Err(ConfigError::EmptyBundleId);
        }
        match (&self.ssl_cert, &self.ssl_key) {
            (Some(_), None) | (None, Some(_)) => Err(ConfigError::TlsPairIncomplete),
            _ => Ok(()),
        }
    }

    /// The validated TLS pair, if one was configured.
    pub fn tls(&self) -> Result<Option<TlsFiles>> {
        self.validate()?;
        Ok(match (&self.ssl_cert, &self.ssl_key) {
            (Some(cert), Some(key)) => Some(TlsFiles {
                cert: cert.clone(),
                key: key.clone(),
            }),
            _ => None,
        })
    }

    /// Host the hub binds to.
    pub fn bind_host(&self) -> &str {
        self.host.as_deref().unwrap_or("127.0.0.1")
    }

    /// URL an out-of-process reporter dials to reach the hub.
    pub fn hub_url(&self) -> String {
        let scheme = if self.ssl_cert.is_some() { "wss" } else { "ws" };
        let host = self.host.as_deref().unwrap_or("localhost");
        format!("{}://{}:{}", scheme, host, self.port)
    }
}

fn default_port() -> u16 {
    4474
}

fn default_true() -> bool {
    true
}

fn default_basedir() -> PathBuf {
    PathBuf::from(".")
}

fn default_bundle_id() -> String {
    "main".to_string()
}
