//! Append-only audit log of HTTP broadcasts.
//!
//! One line per accepted `POST /broadcast`: `<rfc3339>\t<remote address>\t<event type>`.
//! Writes happen on a spawned task and failures are only logged; the audit
//! trail never affects the request.

use std::{path::PathBuf, sync::Arc};

use shoutout_shared::time::{Clock, timestamp_to_rfc3339};
use tokio::io::AsyncWriteExt;

use crate::domain::{HubObserver, HubSignal};

pub struct BroadcastLogObserver {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl BroadcastLogObserver {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    fn format_line(&self, remote_address: &str, kind: &str) -> String {
        format!(
            "{}\t{}\t{}\n",
            timestamp_to_rfc3339(self.clock.now_millis()),
            remote_address,
            kind
        )
    }
}

async fn append_line(path: PathBuf, line: String) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

impl HubObserver for BroadcastLogObserver {
    fn observe(&self, signal: &HubSignal) {
        let HubSignal::HttpBroadcast {
            remote_address,
            kind,
            ..
        } = signal
        else {
            return;
        };

        let line = self.format_line(remote_address, kind);
        let path = self.path.clone();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime available, broadcast log line dropped");
            return;
        };
        runtime.spawn(async move {
            if let Err(e) = append_line(path.clone(), line).await {
                tracing::warn!("Failed to append to {}: {}", path.display(), e);
            }
        });
    }
}
