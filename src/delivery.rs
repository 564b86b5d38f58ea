use crate::config::MailConfig;
use crate::render::Format;
use lettre::address::{Address, AddressError, Envelope};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

const DEFAULT_SMTP_PORT: u16 = 587;
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("не удалось записать отчёт в {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("некорректный mail.host '{0}': ожидается host или host:port")]
    MailHost(String),
    #[error("некорректный адрес '{value}': {source}")]
    Address {
        value: String,
        source: AddressError,
    },
    #[error("не найден пароль SMTP: задайте '{0}' в окружении или mail.password в config")]
    MissingPassword(String),
    #[error("не удалось собрать письмо: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("ошибка SMTP: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Hands a rendered report to its destination.
pub trait Deliver {
    async fn deliver(&self, body: &str) -> Result<(), DeliveryError>;
}

/// Writes the report to a file, or to stdout when no path is set.
pub struct OutputSink {
    path: Option<PathBuf>,
}

impl OutputSink {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl Deliver for OutputSink {
    async fn deliver(&self, body: &str) -> Result<(), DeliveryError> {
        match &self.path {
            Some(path) => {
                fs::write(path, body).map_err(|source| DeliveryError::Write {
                    path: path.display().to_string(),
                    source,
                })?;
                info!(path = %path.display(), "отчёт записан");
                Ok(())
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(body.as_bytes())
                    .and_then(|_| stdout.flush())
                    .map_err(|source| DeliveryError::Write {
                        path: "stdout".to_string(),
                        source,
                    })
            }
        }
    }
}

pub struct SmtpMailer {
    host: String,
    port: u16,
    credentials: Credentials,
    from: Mailbox,
    to: Mailbox,
    envelope: Envelope,
    subject: String,
    content_type: ContentType,
}

impl SmtpMailer {
    pub fn from_config(cfg: &MailConfig, format: Format) -> Result<Self, DeliveryError> {
        let (host, port) = split_mail_host(&cfg.host)?;
        let password = resolve_password(&cfg.password_env, cfg.password.as_deref())?;
        let from: Mailbox = parse_address(&cfg.from)?;
        let to: Mailbox = parse_address(&cfg.to)?;
        let envelope_from = match &cfg.from_address {
            Some(addr) => parse_address::<Address>(addr)?,
            None => from.email.clone(),
        };
        let envelope_to = match &cfg.to_address {
            Some(addr) => parse_address::<Address>(addr)?,
            None => to.email.clone(),
        };
        let envelope = Envelope::new(Some(envelope_from), vec![envelope_to])?;
        let content_type = match format {
            Format::Html => ContentType::TEXT_HTML,
            Format::Json => ContentType::TEXT_PLAIN,
        };

        Ok(Self {
            host,
            port,
            credentials: Credentials::new(cfg.username.clone(), password),
            from,
            to,
            envelope,
            subject: cfg.subject.clone(),
            content_type,
        })
    }

    pub fn build_message(&self, body: &str) -> Result<Message, DeliveryError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.clone())
            .header(self.content_type.clone())
            .envelope(self.envelope.clone())
            .body(body.to_string())?;
        Ok(message)
    }
}

impl Deliver for SmtpMailer {
    async fn deliver(&self, body: &str) -> Result<(), DeliveryError> {
        let message = self.build_message(body)?;
        let builder = if self.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
        };
        let transport = builder
            .port(self.port)
            .credentials(self.credentials.clone())
            .build();

        transport.send(message).await?;
        info!(host = %self.host, port = self.port, to = %self.to, "отчёт отправлен");
        Ok(())
    }
}

/// `smtp.example.org:587` -> (`smtp.example.org`, 587). Without a port the
/// submission port is assumed.
pub fn split_mail_host(value: &str) -> Result<(String, u16), DeliveryError> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    let (host, port) = match parts[..] {
        [host] => (host, DEFAULT_SMTP_PORT),
        [host, port] => (
            host,
            port.parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| DeliveryError::MailHost(value.to_string()))?,
        ),
        _ => return Err(DeliveryError::MailHost(value.to_string())),
    };
    if host.is_empty() {
        return Err(DeliveryError::MailHost(value.to_string()));
    }
    Ok((host.to_string(), port))
}

fn resolve_password(env_name: &str, cfg_password: Option<&str>) -> Result<String, DeliveryError> {
    if let Ok(v) = std::env::var(env_name) {
        if !v.trim().is_empty() {
            return Ok(v);
        }
    }
    cfg_password
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DeliveryError::MissingPassword(env_name.to_string()))
}

fn parse_address<T>(value: &str) -> Result<T, DeliveryError>
where
    T: std::str::FromStr<Err = AddressError>,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|source| DeliveryError::Address {
            value: value.to_string(),
            source,
        })
}
