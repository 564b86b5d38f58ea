pub mod disk;
pub mod ip;
pub mod system;

use crate::config::Config;
use crate::report::DiskEntry;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("command `{command}' failed: {reason}")]
    Command { command: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("unexpected {what}: {detail}")]
    Parse { what: &'static str, detail: String },
}

/// Point-in-time facts about the host. Each operation is independent.
pub trait HostFacts {
    fn uptime(&self) -> Result<Duration, CollectError>;

    /// `Ok(None)` means the lookup is disabled.
    async fn external_ip(&self) -> Result<Option<String>, CollectError>;

    fn interfaces(&self) -> Result<Vec<String>, CollectError>;

    fn disk_usage(&self) -> Result<Vec<DiskEntry>, CollectError>;

    fn host_name(&self) -> Option<String>;
}

pub struct SystemHost {
    client: Client,
    uptime_path: PathBuf,
    disk_command: String,
    disk_args: Vec<String>,
    ip_lookup: Option<ip::IpLookup>,
}

impl SystemHost {
    pub fn from_config(cfg: &Config) -> Self {
        let client = Client::builder()
            .user_agent(concat!("hostreport/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        let ip_lookup = cfg.external_ip.enabled.then(|| ip::IpLookup {
            url: cfg.external_ip.url.clone(),
            timeout: Duration::from_millis(cfg.external_ip.timeout_ms),
        });

        Self {
            client,
            uptime_path: PathBuf::from(&cfg.uptime.path),
            disk_command: cfg.disk.command.clone(),
            disk_args: cfg.disk.args.clone(),
            ip_lookup,
        }
    }
}

impl HostFacts for SystemHost {
    fn uptime(&self) -> Result<Duration, CollectError> {
        system::read_uptime(&self.uptime_path)
    }

    async fn external_ip(&self) -> Result<Option<String>, CollectError> {
        match &self.ip_lookup {
            Some(lookup) => lookup.fetch(&self.client).await.map(Some),
            None => Ok(None),
        }
    }

    fn interfaces(&self) -> Result<Vec<String>, CollectError> {
        system::collect_interfaces()
    }

    fn disk_usage(&self) -> Result<Vec<DiskEntry>, CollectError> {
        disk::collect_disk_usage(&self.disk_command, &self.disk_args)
    }

    fn host_name(&self) -> Option<String> {
        system::host_name()
    }
}
