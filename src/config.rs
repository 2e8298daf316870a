use reqwest::Url;
use serde::Deserialize;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ForwarderCfg {
    #[serde(default)]
    pub http: HttpCfg,
    #[serde(default)]
    pub forward: ForwardCfg,
    #[serde(default)]
    pub store: StoreCfg,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct HttpCfg {
    pub bind: SocketAddr,
    /// How long `/readyz` reports 503 before the listener closes on shutdown.
    pub shutdown_drain_ms: u64,
}
impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            shutdown_drain_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields, default)]
pub struct ForwardCfg {
    /// Remote-write receive endpoint, e.g. `http://thanos-receive:19291/api/v1/receive`.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct StoreCfg {
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}
impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            cleanup_interval_secs: 30,
        }
    }
}

impl StoreCfg {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080)
}

/// Command-line values that take precedence over file and environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<String>,
    pub http_bind: Option<String>,
    pub forward_url: Option<String>,
}

impl ForwarderCfg {
    pub fn load(overrides: &Overrides) -> anyhow::Result<Self> {
        Self::from_builder(build_config(overrides)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.forward_url()?;
        anyhow::ensure!(self.store.ttl_secs > 0, "store.ttl_secs must be positive");
        anyhow::ensure!(
            self.store.cleanup_interval_secs > 0,
            "store.cleanup_interval_secs must be positive"
        );
        Ok(())
    }

    pub fn forward_url(&self) -> anyhow::Result<Url> {
        let raw = self
            .forward
            .url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("forward.url is required"))?;
        let url = Url::parse(raw)?;
        anyhow::ensure!(
            matches!(url.scheme(), "http" | "https"),
            "forward.url must be an http(s) URL, got {raw}"
        );
        Ok(url)
    }

    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_millis(self.http.shutdown_drain_ms)
    }

    fn from_builder(cfg: config::Config) -> anyhow::Result<Self> {
        Ok(cfg.try_deserialize()?)
    }
}

fn build_config(overrides: &Overrides) -> anyhow::Result<config::Config> {
    use config::{Config, Environment, File};
    let mut builder = Config::builder()
        .add_source(File::with_name("forwarder").required(false))
        .add_source(Environment::with_prefix("FORWARDER").separator("__"));
    if let Some(path) = &overrides.config {
        builder = builder.add_source(File::with_name(path));
    }
    if let Some(bind) = &overrides.http_bind {
        builder = builder.set_override("http.bind", bind.as_str())?;
    }
    if let Some(url) = &overrides.forward_url {
        builder = builder.set_override("forward.url", url.as_str())?;
    }
    Ok(builder.build()?)
}
