use crate::authlog::{AuthLogAnalyzer, FailureRecord};
use crate::collectors::{CollectError, HostFacts};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskEntry {
    pub filesystem: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub use_percent: String,
    pub mount_point: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSnapshot {
    pub host_name: Option<String>,
    pub generated_at_unix: i64,
    #[serde(rename = "uptime_seconds", serialize_with = "duration_secs")]
    pub uptime: Duration,
    pub external_ip: String,
    pub interfaces: Vec<String>,
    pub failures: Vec<FailureRecord>,
    pub disks: Vec<DiskEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactSource {
    Uptime,
    ExternalIp,
    Interfaces,
    AuthLog,
}

impl fmt::Display for FactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FactSource::Uptime => "uptime",
            FactSource::ExternalIp => "external ip",
            FactSource::Interfaces => "network interfaces",
            FactSource::AuthLog => "auth log",
        };
        f.write_str(name)
    }
}

/// A collector failure that left its field empty without stopping the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub source: FactSource,
    pub message: String,
}

#[derive(Debug)]
pub struct Assembly {
    pub snapshot: ReportSnapshot,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("disk usage collection failed: {0}")]
    DiskUsage(#[source] CollectError),
}

/// Runs every collector once, in order, and composes the snapshot.
///
/// Only a disk usage failure aborts the run. Every other failure empties its
/// own field and is returned as a [`Warning`].
pub async fn assemble<H: HostFacts>(
    host: &H,
    auth_log: &AuthLogAnalyzer,
) -> Result<Assembly, ReportError> {
    let mut warnings = Vec::new();

    let uptime = soft(&mut warnings, FactSource::Uptime, host.uptime()).unwrap_or_default();
    let external_ip = soft(&mut warnings, FactSource::ExternalIp, host.external_ip().await)
        .flatten()
        .unwrap_or_default();
    let interfaces =
        soft(&mut warnings, FactSource::Interfaces, host.interfaces()).unwrap_or_default();
    let failures =
        soft(&mut warnings, FactSource::AuthLog, auth_log.analyze()).unwrap_or_default();

    let disks = host.disk_usage().map_err(ReportError::DiskUsage)?;

    let snapshot = ReportSnapshot {
        host_name: host.host_name(),
        generated_at_unix: now_unix(),
        uptime,
        external_ip,
        interfaces,
        failures,
        disks,
    };
    info!(
        failures = snapshot.failures.len(),
        disks = snapshot.disks.len(),
        interfaces = snapshot.interfaces.len(),
        warnings = warnings.len(),
        "report assembled"
    );

    Ok(Assembly { snapshot, warnings })
}

fn soft<T, E: fmt::Display>(
    warnings: &mut Vec<Warning>,
    source: FactSource,
    result: Result<T, E>,
) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(err) => {
            warn!(collector = %source, error = %err, "collector failed, field left empty");
            warnings.push(Warning {
                source,
                message: err.to_string(),
            });
            None
        }
    }
}

fn duration_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
