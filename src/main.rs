mod app;
mod logging;

use anyhow::{anyhow, Context};
use background_service::shutdown_channel;
use feed_client::HttpFeedClient;
use seedgate_core::{AppSettings, ErrorExt, ErrorReporter};
use std::process::ExitCode;
use transmission_client::TransmissionClient;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("seedgate: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let settings_path = AppSettings::default_path();
    let settings = AppSettings::load_or_default(&settings_path)
        .with_context(|| format!("invalid settings in {}", settings_path.display()))?;

    logging::init(&settings.paths.log)?;
    tracing::info!("Starting seedgate {}", env!("CARGO_PKG_VERSION"));

    let feed_source = HttpFeedClient::new(settings.polling.feed_timeout())?;
    let client = TransmissionClient::connect(&settings.transmission)?;

    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.trigger();
        }
    });

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();

    match app::run(&settings, feed_source, client, &mut input, &mut output, &shutdown).await {
        Ok(cycles) => {
            tracing::info!("Shut down cleanly after {} poll cycles", cycles);
            Ok(())
        }
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            Err(anyhow!(e.user_friendly_message()))
        }
    }
}
