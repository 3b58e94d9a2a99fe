//! Binary entry point: flags, environment, tracing, and the console loop.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use draftmail::app::App;
use draftmail::config::AppConfig;
use draftmail::draft::DraftGenerator;
use draftmail::gemini::GeminiClient;
use draftmail::smtp::{MailDispatch, Mailer};
use draftmail::transport::ReqwestTransport;
use draftmail::ui::Console;

/// Draft an email with the Gemini API and send it over SMTP.
#[derive(Parser, Debug)]
#[command(name = "draftmail", version, about)]
struct Args {
    /// Generation model identifier.
    #[arg(long)]
    model: Option<String>,

    /// SMTP server host.
    #[arg(long)]
    smtp_host: Option<String>,

    /// SMTP server port.
    #[arg(long)]
    smtp_port: Option<u16>,

    /// HTTP request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; real environment variables win.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(host) = args.smtp_host {
        config.smtp_host = host;
    }
    if let Some(port) = args.smtp_port {
        config.smtp_port = port;
    }
    if let Some(secs) = args.timeout_secs {
        config.request_timeout = std::time::Duration::from_secs(secs);
    }
    let config = Arc::new(config);

    let transport = Arc::new(ReqwestTransport::new(
        config.request_timeout,
        config.connect_timeout,
    )?);
    let generator = Arc::new(GeminiClient::new(config.clone(), transport));
    let drafter = DraftGenerator::new(generator);
    let dispatcher: Arc<dyn MailDispatch> = Arc::new(Mailer::new(config.clone()));

    let mut app = App::new(drafter, dispatcher);
    Console::new().run(&mut app).await?;
    Ok(())
}
