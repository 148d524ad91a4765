//! gravel-chat - ask questions from the terminal
//!
//! One question per line, asked once the previous answer has settled. The
//! answer is printed as it streams in. Ctrl-C abandons the current answer (or
//! exits when idle); EOF exits.

use gravel_chat::terminal::{ask_lines, render};
use gravel_chat::{ClientConfig, ConversationController, HttpEventSource};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the answer text
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gravel_chat=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env()?;
    let source = HttpEventSource::new(&config)?;
    tracing::info!(endpoint = %source.endpoint(), "Starting conversation");

    let controller = ConversationController::new(source, &config);
    let printer = tokio::spawn(render(controller.subscribe()));

    ask_lines(&controller, BufReader::new(tokio::io::stdin())).await?;

    controller.shutdown().await;
    if let Err(e) = printer.await {
        tracing::error!(error = %e, "Printer task failed");
    }
    Ok(())
}
