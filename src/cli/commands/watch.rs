use tokio::sync::broadcast::error::RecvError;

use super::open_context;
use crate::channel::{InboundMessage, SendOutcome};
use crate::cli::OutputFormat;

fn print_message(output_format: &OutputFormat, message: &InboundMessage) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string(message)?),
        OutputFormat::Text => {
            let marker = if message.kind.is_alert() { "!" } else { " " };
            println!(
                "{} {}  {:<32} {}",
                marker,
                message.received_at.format("%H:%M:%S"),
                message.kind,
                message.summary().unwrap_or("")
            );
        }
    }
    Ok(())
}

/// Follow the live channel until interrupted or `count` messages arrived
pub async fn handle(count: Option<usize>, ping: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context()?;
    let mut messages = ctx.channel().subscribe();
    let mut states = ctx.channel().watch_state();

    if ctx.bootstrap().await.is_none() {
        anyhow::bail!("Not signed in. Use 'kitchen auth login <username>' first");
    }

    let mut seen = 0usize;
    let mut pinged = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                if let OutputFormat::Text = output_format {
                    eprintln!("-- {}", state);
                }
                if ping && !pinged && ctx.channel().ping().await == SendOutcome::Sent {
                    pinged = true;
                }
            }

            received = messages.recv() => match received {
                Ok(message) => {
                    print_message(&output_format, &message)?;
                    seen += 1;
                    if count.is_some_and(|limit| seen >= limit) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("watch fell behind, {} message(s) skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    ctx.shutdown().await;
    Ok(())
}
