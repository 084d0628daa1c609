// Stream connection worker: one persistent public stream per server.
//
// Connects, reads lines, hands update payloads to the ingest pipeline, and
// reconnects after a fixed delay whenever the connection fails or ends.
// There is no read timeout: a server that accepts the connection and then
// goes silent keeps its worker in `Connected` until the socket closes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderValue, CONNECTION};
use tracing::{debug, info, warn};

use super::frames::{LineBuffer, UpdateFramer};
use crate::config::{server_url, Config};
use crate::ingest::PostIngest;
use crate::user::client::USER_AGENT;

/// Connection state of a server stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// A persistent connection to one server's public stream.
pub struct ServerStream {
    server: String,
    url: String,
    client: reqwest::Client,
    reconnect_delay: Duration,
    state: Mutex<ConnectionState>,
}

impl ServerStream {
    pub fn new(server: &str, config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            server: server.to_string(),
            url: format!("{}/api/v1/streaming/public", server_url(server)),
            client,
            reconnect_delay: config.reconnect_delay,
            state: Mutex::new(ConnectionState::Disconnected),
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Stream forever, reconnecting after every failure or close.
    pub async fn run(self: Arc<Self>, ingest: Arc<PostIngest>) {
        loop {
            match self.stream_once(&ingest).await {
                Ok(()) => {
                    info!(server = %self.server, "Stream closed by server");
                }
                Err(e) => {
                    warn!(server = %self.server, error = %e, "Stream failed");
                }
            }
            self.set_state(ConnectionState::Disconnected);

            debug!(
                server = %self.server,
                delay_secs = self.reconnect_delay.as_secs_f64(),
                "Waiting before reconnect"
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Connect once and process the stream until it ends.
    ///
    /// `Ok` means the server closed the stream normally.
    pub async fn stream_once(&self, ingest: &PostIngest) -> Result<()> {
        self.set_state(ConnectionState::Connecting);
        info!(server = %self.server, "Connecting");

        let mut response = self
            .client
            .get(&self.url)
            .header(CONNECTION, HeaderValue::from_static("keep-alive"))
            .send()
            .await
            .with_context(|| format!("Failed to connect to {}", self.server))?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("{} returned {status}", self.server);
        }

        self.set_state(ConnectionState::Connected);
        info!(server = %self.server, "Connected");

        let mut lines = LineBuffer::new();
        let mut framer = UpdateFramer::new();

        while let Some(chunk) = response
            .chunk()
            .await
            .with_context(|| format!("Stream from {} interrupted", self.server))?
        {
            lines.push(&chunk);
            while let Some(line) = lines
                .next_line()
                .with_context(|| format!("Malformed stream from {}", self.server))?
            {
                if let Some(payload) = framer.feed(&line) {
                    let outcome = ingest.ingest(payload);
                    debug!(server = %self.server, outcome = ?outcome, "Update ingested");
                }
            }
        }

        Ok(())
    }
}
