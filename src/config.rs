use crate::authlog::RegexLineMatcher;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth_log: AuthLogConfig,
    #[serde(default)]
    pub uptime: UptimeConfig,
    #[serde(default)]
    pub disk: DiskConfig,
    #[serde(default)]
    pub external_ip: ExternalIpConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthLogConfig {
    #[serde(default = "default_auth_log_path")]
    pub path: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub top: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UptimeConfig {
    #[serde(default = "default_uptime_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiskConfig {
    #[serde(default = "default_disk_command")]
    pub command: String,
    #[serde(default = "default_disk_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalIpConfig {
    #[serde(default = "default_external_ip_enabled")]
    pub enabled: bool,
    #[serde(default = "default_external_ip_url")]
    pub url: String,
    #[serde(default = "default_external_ip_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_title")]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// `smtp.example.org:587`; the part before the port is the auth host.
    #[serde(default = "default_mail_host")]
    pub host: String,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_mail_password_env")]
    pub password_env: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Header mailboxes, e.g. `Server report <report@example.com>`.
    #[serde(default = "default_mail_from")]
    pub from: String,
    #[serde(default = "default_mail_to")]
    pub to: String,
    /// Envelope addresses; fall back to the header mailboxes when empty.
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    #[serde(default = "default_mail_subject")]
    pub subject: String,
}

impl Default for AuthLogConfig {
    fn default() -> Self {
        Self {
            path: default_auth_log_path(),
            pattern: None,
            top: None,
        }
    }
}

impl Default for UptimeConfig {
    fn default() -> Self {
        Self {
            path: default_uptime_path(),
        }
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            command: default_disk_command(),
            args: default_disk_args(),
        }
    }
}

impl Default for ExternalIpConfig {
    fn default() -> Self {
        Self {
            enabled: default_external_ip_enabled(),
            url: default_external_ip_url(),
            timeout_ms: default_external_ip_timeout_ms(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: default_mail_host(),
            username: String::new(),
            password_env: default_mail_password_env(),
            password: None,
            from: default_mail_from(),
            to: default_mail_to(),
            from_address: None,
            to_address: None,
            subject: default_mail_subject(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать файл конфигурации {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать YAML в {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("не удалось создать файл конфигурации {path}: {source}")]
    Create {
        path: String,
        source: std::io::Error,
    },
    #[error("ошибка валидации конфигурации: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads the config, first writing the default one if the file is absent.
    ///
    /// The created file is readable by the owner only.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            write_default(path_ref).map_err(|source| ConfigError::Create {
                path: path_ref.display().to_string(),
                source,
            })?;
            info!(path = %path_ref.display(), "создан файл конфигурации по умолчанию");
        }
        Self::load_from_file(path_ref)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_log.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле auth_log.path обязательно".to_string(),
            ));
        }
        if self.auth_log.top == Some(0) {
            return Err(ConfigError::Validation(
                "auth_log.top должно быть >= 1".to_string(),
            ));
        }
        if let Some(pattern) = &self.auth_log.pattern {
            if let Err(err) = RegexLineMatcher::new(pattern) {
                return Err(ConfigError::Validation(format!(
                    "auth_log.pattern некорректен: {err}"
                )));
            }
        }
        if self.uptime.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле uptime.path обязательно".to_string(),
            ));
        }
        if self.disk.command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле disk.command обязательно".to_string(),
            ));
        }
        if self.external_ip.enabled {
            if self.external_ip.url.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "external_ip.url не должен быть пустым".to_string(),
                ));
            }
            if self.external_ip.timeout_ms == 0 {
                return Err(ConfigError::Validation(
                    "external_ip.timeout_ms должен быть > 0".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// `<config dir>/hostreport/config.yaml`, e.g. `~/.config/hostreport/config.yaml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hostreport")
            .join("config.yaml")
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn write_default(path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_private_dir(dir)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(Config::example_yaml().as_bytes())
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

fn default_auth_log_path() -> String {
    "/var/log/auth.log".to_string()
}

fn default_uptime_path() -> String {
    "/proc/uptime".to_string()
}

fn default_disk_command() -> String {
    "df".to_string()
}

fn default_disk_args() -> Vec<String> {
    vec!["--si".to_string()]
}

const fn default_external_ip_enabled() -> bool {
    true
}

fn default_external_ip_url() -> String {
    "https://jsonip.com".to_string()
}

const fn default_external_ip_timeout_ms() -> u64 {
    5000
}

fn default_report_title() -> String {
    "Server report".to_string()
}

fn default_mail_host() -> String {
    "smtp.gmail.com:587".to_string()
}

fn default_mail_password_env() -> String {
    "HOSTREPORT_SMTP_PASSWORD".to_string()
}

fn default_mail_from() -> String {
    "Server report <report@example.com>".to_string()
}

fn default_mail_to() -> String {
    "Admin <admin@example.com>".to_string()
}

fn default_mail_subject() -> String {
    "Server report".to_string()
}
