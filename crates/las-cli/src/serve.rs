//! Stdio transport.
//!
//! Inbound events arrive as newline-delimited JSON on `input` and go onto the
//! bus's downstream lane. A single consumer hands them to the
//! [`EventHandler`] one at a time on the blocking pool. Every response the
//! handler posts upstream is written to `output` as one JSON line.
//!
//! Neither lane drops events: the reader waits while the downstream lane is
//! full and the poster waits while the upstream lane is full.
//!
//! Shutdown drains in order: stop reading, finish the queued events, flush
//! the queued responses.

use std::sync::Arc;
use std::time::Duration;

use las_middleware::EventBus;
use las_runtime::EventHandler;
use las_types::Event;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const BACKPRESSURE_POLL: Duration = Duration::from_millis(5);

/// Counters reported when the pump stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeStats {
    pub received: usize,
    pub malformed: usize,
    pub answered: usize,
}

/// Resolves once `flag` reads `true`. A closed flag never resolves.
async fn raised(flag: &mut watch::Receiver<bool>) {
    if flag.wait_for(|set| *set).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Pump events from `input` through `handler` until EOF or `interrupt`.
///
/// Returns the counters together with `output` once every response has been
/// written.
pub async fn serve<R, W>(
    input: R,
    mut output: W,
    handler: Arc<EventHandler>,
    bus: Arc<EventBus>,
    mut interrupt: watch::Receiver<bool>,
) -> std::io::Result<(ServeStats, W)>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (drained_tx, mut drained) = watch::channel(false);
    let (processed_tx, mut processed) = watch::channel(false);

    let mut responses = bus.subscribe_upstream();
    let writer = tokio::spawn(async move {
        let mut answered = 0;
        loop {
            tokio::select! {
                biased;
                response = responses.next() => {
                    let Some(response) = response else { break };
                    let mut line = serde_json::to_vec(&response)?;
                    line.push(b'\n');
                    output.write_all(&line).await?;
                    output.flush().await?;
                    answered += 1;
                }
                _ = raised(&mut processed) => break,
            }
        }
        Ok::<_, std::io::Error>((answered, output))
    });

    let mut inbound = bus.subscribe_downstream();
    let processor = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                event = inbound.next() => {
                    let Some(event) = event else { break };
                    let handler = handler.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || handler.handle_event(&event)).await {
                        error!(error = %e, "Event handler task failed");
                    }
                }
                _ = raised(&mut drained) => break,
            }
        }
    });

    let mut stats = ServeStats::default();
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = raised(&mut interrupt) => {
                info!("Interrupted, draining queued events");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("Input closed");
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: Event = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping malformed event");
                stats.malformed += 1;
                continue;
            }
        };
        stats.received += 1;

        while bus.downstream_full() {
            tokio::time::sleep(BACKPRESSURE_POLL).await;
        }
        if let Err(e) = bus.publish_downstream(event) {
            error!(error = %e, "Failed to queue event");
        }
    }

    drained_tx.send_replace(true);
    processor.await.map_err(std::io::Error::other)?;
    processed_tx.send_replace(true);
    let (answered, output) = writer.await.map_err(std::io::Error::other)??;
    stats.answered = answered;

    info!(
        received = stats.received,
        malformed = stats.malformed,
        answered = stats.answered,
        "Event pump stopped"
    );
    Ok((stats, output))
}
