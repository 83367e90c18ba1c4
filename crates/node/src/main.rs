//! `bangbang-node` -- run one bang-bang node over a stream of events.
//!
//! Reads newline-delimited JSON events from stdin and writes every output
//! message and status update as a JSON line on stdout. Logs go to stderr.
//!
//! # Environment variables
//!
//! | Variable                  | Required | Default | Description                              |
//! |---------------------------|----------|---------|------------------------------------------|
//! | `BANGBANG_CONFIG`         | no       | --      | Path to a JSON node configuration        |
//! | `BANGBANG_*`              | no       | --      | Individual config fields, see `NodeConfig::from_env` |
//! | `BANGBANG_FLOW_CONTEXT`   | no       | --      | JSON object of initial flow variables    |
//! | `BANGBANG_GLOBAL_CONTEXT` | no       | --      | JSON object of initial global variables  |
//! | `RUST_LOG`                | no       | `bangbang_node=info,bangbang_core=info` | Log filter |

use std::sync::Arc;

use anyhow::Context as _;
use bangbang_core::{BangBangNode, Collaborators, NodeConfig, StandardResolver, TracingLogger};
use bangbang_events::EventBus;
use bangbang_node::{context, printer, runner};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Name used in logs and on the bus when the config does not set one.
const DEFAULT_NODE_NAME: &str = "bang-bang";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bangbang_node=info,bangbang_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = NodeConfig::from_env().context("Failed to load node configuration")?;
    let name = if config.name.is_empty() {
        DEFAULT_NODE_NAME.to_string()
    } else {
        config.name.clone()
    };

    let store = context::seeded_context(|var| std::env::var(var).ok())?;
    let resolver = Arc::new(StandardResolver::new(Arc::new(store)));

    let bus = EventBus::default();
    let rx = bus.subscribe();
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        printer::forward(rx, &mut stdout).await
    });

    let sink = Arc::new(bus.sink_for(name.clone()));
    let collaborators = Collaborators::new(resolver, sink.clone(), sink)
        .with_logger(Arc::new(TracingLogger::named(name.clone())));
    let node = BangBangNode::new(&config, collaborators).context("Invalid node configuration")?;

    tracing::info!(
        node = %name,
        rising = %config.threshold_rising,
        falling = %config.threshold_falling,
        initial_state = %node.state().await,
        valid = node.is_valid(),
        "Starting bangbang-node",
    );

    let stats = runner::run(&node, BufReader::new(tokio::io::stdin())).await?;

    // Dropping every sender closes the bus so the printer drains and exits.
    drop(node);
    drop(bus);
    let written = printer.await??;

    tracing::info!(
        events = stats.events,
        transitions = stats.transitions,
        rejected = stats.rejected,
        malformed = stats.malformed,
        lines_written = written,
        "Input exhausted",
    );
    Ok(())
}
