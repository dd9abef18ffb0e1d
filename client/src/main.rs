use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use relay_client::config::ClientConfig;
use relay_client::view::TerminalView;
use relay_client::{ConnectionStatus, InputEvent, Reconnector, WsConnector};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::parse();

    // Logs go to stderr so they do not interleave with the chat on stdout.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "relay_client=warn".into());
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let (input_tx, input_rx) = mpsc::channel(32);
    let reconnector = Reconnector::new(config.reconnect_delay());
    let status = reconnector.subscribe();
    let mut connector = WsConnector::new(
        config.url.clone(),
        config.typing_idle(),
        input_rx,
        TerminalView::stdout(),
    );

    let mut input_task = tokio::spawn(read_stdin(input_tx, status));

    tokio::select! {
        _ = reconnector.run(&mut connector) => {}
        result = &mut input_task => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Input task failed");
            }
            tracing::info!("Input closed, exiting");
        }
    }

    Ok(())
}

/// Each line read is one edit followed by a submit. Lines typed while the
/// connection is down are discarded.
async fn read_stdin(input: mpsc::Sender<InputEvent>, status: watch::Receiver<ConnectionStatus>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                return;
            }
        };

        if !status.borrow().is_connected() {
            eprintln!("(not connected, message discarded)");
            continue;
        }

        for event in [InputEvent::Changed(line.clone()), InputEvent::Submit(line)] {
            if input.send(event).await.is_err() {
                return;
            }
        }
    }
}
