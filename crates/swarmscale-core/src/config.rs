//! swarmscale.toml configuration parser.
//!
//! Every field has a default, so the daemon runs without a file. Values
//! are resolved once at startup: file, then environment overrides, then
//! validation. Nothing downstream reads the environment afterwards.

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::types::ScaleBounds;

pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SLACK_HOOK: &str = "SLACK_HOOK";
pub const ENV_DRYRUN: &str = "DRYRUN";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScalerConfig {
    pub dry_run: bool,
    pub server: ServerConfig,
    pub scaling: ScalingConfig,
    pub registry: RegistryConfig,
    pub update: UpdateConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8083)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScalingConfig {
    pub min_replicas: u32,
    pub max_replicas: u32,
    /// Upper bound on each orchestrator read or command, e.g. "30s".
    pub step_timeout: String,
    /// Upper bound on one whole scale action, all of its commands included.
    pub apply_timeout: String,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            min_replicas: ScaleBounds::DEFAULT.min,
            max_replicas: ScaleBounds::DEFAULT.max,
            step_timeout: "30s".to_string(),
            apply_timeout: "120s".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            region: "eu-central-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl RegistryConfig {
    /// Both halves of the credential pair, if configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "<redacted>"))
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Rolling update settings used when a scale-up refreshes the image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateConfig {
    pub parallelism: u32,
    pub delay: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            parallelism: 1,
            delay: "10s".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifyConfig {
    pub slack_hook: Option<String>,
    pub username: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            slack_hook: None,
            username: "scaler".to_string(),
        }
    }
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("slack_hook", &self.slack_hook.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .finish()
    }
}

impl ScalerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load the optional file, apply process environment overrides, validate.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(id) = non_empty(ENV_ACCESS_KEY_ID) {
            self.registry.access_key_id = Some(id);
        }
        if let Some(secret) = non_empty(ENV_SECRET_ACCESS_KEY) {
            self.registry.secret_access_key = Some(secret);
        }
        if let Some(hook) = non_empty(ENV_SLACK_HOOK) {
            self.notify.slack_hook = Some(hook);
        }
        if let Some(flag) = non_empty(ENV_DRYRUN) {
            self.dry_run = !matches!(flag.to_ascii_lowercase().as_str(), "0" | "false" | "no");
        }
    }

    /// Check cross-field invariants and that durations parse.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.bounds()?;
        let step = self.step_timeout()?;
        let apply = self.apply_timeout()?;
        anyhow::ensure!(
            apply >= step,
            "scaling.apply_timeout ({apply:?}) must not be shorter than scaling.step_timeout ({step:?})"
        );
        self.update_delay()?;
        anyhow::ensure!(self.update.parallelism > 0, "update.parallelism must be at least 1");
        Ok(())
    }

    pub fn bounds(&self) -> anyhow::Result<ScaleBounds> {
        Ok(ScaleBounds::new(
            self.scaling.min_replicas,
            self.scaling.max_replicas,
        )?)
    }

    pub fn step_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.scaling.step_timeout)
            .with_context(|| format!("scaling.step_timeout {:?}", self.scaling.step_timeout))
    }

    pub fn apply_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.scaling.apply_timeout)
            .with_context(|| format!("scaling.apply_timeout {:?}", self.scaling.apply_timeout))
    }

    pub fn update_delay(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.update.delay)
            .with_context(|| format!("update.delay {:?}", self.update.delay))
    }
}

/// Parse a duration string like "30s", "5m", or a bare number of seconds.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let secs = if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>()?
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim().parse::<u64>()? * 60
    } else {
        s.parse::<u64>()?
    };
    Ok(Duration::from_secs(secs))
}
