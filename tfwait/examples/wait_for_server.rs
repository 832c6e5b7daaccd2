//! Waits for a simulated server to finish provisioning.
//!
//! The "API" here is an in-memory counter that walks through the states a
//! real describe call would report; swap it for an HTTP client and the waiter
//! code does not change.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tfwait::{Context, Refresh, RefreshResult, StateChangeConf};

#[derive(Debug, Clone)]
struct Server {
    id: String,
    state: String,
}

/// Stands in for a remote API: each describe call observes the server one
/// step further through provisioning.
#[derive(Clone)]
struct FakeApi {
    polls: Arc<AtomicUsize>,
}

impl FakeApi {
    async fn describe_server(&self, id: &str) -> RefreshResult<Server> {
        let state = match self.polls.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => "provisioning",
            2 => "booting",
            _ => "running",
        };
        tracing::info!(id, state, "describe");
        Ok(Refresh::found(
            Server {
                id: id.to_string(),
                state: state.to_string(),
            },
            state,
        ))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let api = FakeApi {
        polls: Arc::new(AtomicUsize::new(0)),
    };
    let ctx = Context::new();

    let probe_api = api.clone();
    let conf = StateChangeConf::new(move || {
        let api = probe_api.clone();
        async move { api.describe_server("srv-1").await }
    })
    .pending(["provisioning", "booting"])
    .target(["running"])
    .fatal(["error"])
    .timeout(Duration::from_secs(60))
    .delay(Duration::from_millis(200))
    .max_delay(Duration::from_secs(2));

    match conf.wait(&ctx).await {
        Ok(Some(server)) => tracing::info!(id = %server.id, state = %server.state, "server ready"),
        Ok(None) => tracing::warn!("server disappeared while waiting"),
        Err(err) => tracing::error!(error = %err, "wait failed"),
    }
}
