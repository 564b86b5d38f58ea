mod authlog;
mod collectors;
mod config;
mod delivery;
mod render;
mod report;

use authlog::{AuthLogAnalyzer, LineMatcher, RegexLineMatcher};
use clap::Parser;
use collectors::SystemHost;
use config::Config;
use delivery::{Deliver, OutputSink, SmtpMailer};
use render::Format;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostreport")]
#[command(version)]
struct Cli {
    #[arg(long, default_value_os_t = Config::default_path())]
    config: PathBuf,
    #[arg(long)]
    print_default_config: bool,
    /// Overrides auth_log.path from the config.
    #[arg(long)]
    auth_log: Option<String>,
    /// Write the report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Mail the report using the `mail` section of the config.
    #[arg(long, conflicts_with = "output")]
    send: bool,
    #[arg(long, value_enum, default_value_t = Format::Html)]
    format: Format,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let mut cfg = match Config::load_or_create(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "не удалось загрузить конфигурацию");
            std::process::exit(1);
        }
    };
    if let Some(path) = cli.auth_log {
        cfg.auth_log.path = path;
    }

    let matcher = match build_matcher(&cfg) {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "не удалось подготовить шаблон журнала аутентификации");
            std::process::exit(1);
        }
    };
    let analyzer = AuthLogAnalyzer::new(&cfg.auth_log.path, matcher, cfg.auth_log.top);
    let host = SystemHost::from_config(&cfg);

    info!(
        config = %cli.config.display(),
        auth_log = %analyzer.path().display(),
        "сбор отчёта"
    );

    let assembly = match report::assemble(&host, &analyzer).await {
        Ok(a) => a,
        Err(err) => {
            error!(error = %err, "отчёт не собран");
            std::process::exit(1);
        }
    };

    let body = match render::render(
        cli.format,
        &cfg.report.title,
        &assembly.snapshot,
        &assembly.warnings,
    ) {
        Ok(body) => body,
        Err(err) => {
            error!(error = %err, "не удалось сформировать отчёт");
            std::process::exit(1);
        }
    };

    let delivered = if cli.send {
        match SmtpMailer::from_config(&cfg.mail, cli.format) {
            Ok(mailer) => mailer.deliver(&body).await,
            Err(err) => Err(err),
        }
    } else {
        OutputSink::new(cli.output).deliver(&body).await
    };
    if let Err(err) = delivered {
        error!(error = %err, "не удалось доставить отчёт");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_matcher(
    cfg: &Config,
) -> Result<Box<dyn LineMatcher + Send + Sync>, authlog::AuthLogError> {
    let matcher = match &cfg.auth_log.pattern {
        Some(pattern) => RegexLineMatcher::new(pattern)?,
        None => RegexLineMatcher::failed_password()?,
    };
    Ok(Box::new(matcher))
}
