//! Line-oriented event loop.
//!
//! Reads newline-delimited JSON events, feeds each one to a
//! [`BangBangNode`], and tallies what happened.

use bangbang_core::{BangBangNode, Outcome};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Per-run counters, logged when the input is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Non-blank lines read.
    pub events: usize,
    /// Lines that were not valid JSON.
    pub malformed: usize,
    pub ignored: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub unchanged: usize,
    pub transitions: usize,
}

impl RunStats {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Ignored => self.ignored += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Rejected(_) => self.rejected += 1,
            Outcome::Unchanged(_) => self.unchanged += 1,
            Outcome::Transitioned { .. } => self.transitions += 1,
        }
    }
}

/// Drive `node` with every event in `input` until end of stream.
///
/// Malformed lines are logged and skipped; only I/O errors abort the run.
pub async fn run<R>(node: &BangBangNode, input: R) -> std::io::Result<RunStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = RunStats::default();
    let mut lines = input.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.events += 1;

        let event: serde_json::Value = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping malformed event");
                stats.malformed += 1;
                continue;
            }
        };

        let outcome = node.apply_event(&event).await;
        tracing::trace!(line = line_no, ?outcome, "Event processed");
        stats.record(&outcome);
    }

    Ok(stats)
}
