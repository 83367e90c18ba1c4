//! Writes bus events as JSON lines.

use bangbang_events::NodeEvent;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{self, error::RecvError};

/// Forward every event from `rx` to `out`, one JSON object per line, until
/// every sender has been dropped. Returns the number of lines written.
pub async fn forward<W>(mut rx: broadcast::Receiver<NodeEvent>, out: &mut W) -> std::io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    loop {
        match rx.recv().await {
            Ok(event) => {
                let mut line = serde_json::to_vec(&event)?;
                line.push(b'\n');
                out.write_all(&line).await?;
                written += 1;
            }
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Output printer fell behind, events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    out.flush().await?;
    Ok(written)
}
