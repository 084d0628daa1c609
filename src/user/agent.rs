// Per-user delivery agent.
//
// Each configured user gets one agent holding their followed tags and a
// private unbounded queue of post URIs. Two tasks run for the life of the
// process: a refresher that reloads the followed tags on a timer, and a
// sender that drains the queue one search call at a time. The queue never
// blocks the router, so a slow home server only delays its own user.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::HomeServer;

/// Receiving end of an agent's outbound queue, consumed by the sender task.
pub struct Outbox {
    receiver: mpsc::UnboundedReceiver<String>,
}

impl Outbox {
    /// Wait for the next queued post URI. `None` once the agent is dropped.
    pub async fn next(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

/// One user's followed tags and outbound queue.
pub struct UserAgent {
    api: Arc<dyn HomeServer>,
    followed: RwLock<HashSet<String>>,
    outbound: mpsc::UnboundedSender<String>,
}

/// Handles of the two background tasks of a started agent.
pub struct AgentTasks {
    pub refresher: JoinHandle<()>,
    pub sender: JoinHandle<()>,
}

impl UserAgent {
    /// Create an agent with an empty tag set. The returned outbox must be
    /// handed to [`UserAgent::start`] (or drained directly in tests).
    pub fn new(api: Arc<dyn HomeServer>) -> (Arc<Self>, Outbox) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let agent = Arc::new(Self {
            api,
            followed: RwLock::new(HashSet::new()),
            outbound,
        });
        (agent, Outbox { receiver })
    }

    pub fn server(&self) -> &str {
        self.api.server()
    }

    /// Snapshot of the current followed tags.
    pub fn followed_tags(&self) -> HashSet<String> {
        self.followed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_followed_tags(&self, tags: HashSet<String>) {
        *self.followed.write().unwrap_or_else(|e| e.into_inner()) = tags;
    }

    /// Match test: enqueue `uri` if any of `tags` is followed.
    ///
    /// Returns true if the post was enqueued. Never blocks.
    pub fn offer(&self, tags: &HashSet<String>, uri: &str) -> bool {
        let matched: Vec<&str> = {
            let followed = self.followed.read().unwrap_or_else(|e| e.into_inner());
            tags.iter()
                .filter(|tag| followed.contains(tag.as_str()))
                .map(String::as_str)
                .collect()
        };

        if matched.is_empty() {
            return false;
        }

        debug!(server = %self.server(), uri = uri, tags = ?matched, "Post matched followed tags");

        if self.outbound.send(uri.to_string()).is_err() {
            warn!(server = %self.server(), uri = uri, "Outbound queue closed, dropping post");
            return false;
        }
        true
    }

    /// Reload the followed tags from the home server.
    ///
    /// On failure the previous set is kept so a transient error does not
    /// silence the user until the next refresh.
    pub async fn refresh_tags(&self) -> Result<usize> {
        let tags = self.api.followed_tags().await?;
        let count = tags.len();
        info!(server = %self.server(), tags = ?tags, "Followed tags refreshed");
        self.set_followed_tags(tags);
        Ok(count)
    }

    /// Spawn the refresher and sender tasks.
    ///
    /// The refresher waits one `refresh_interval` before its first reload;
    /// callers refresh once themselves at startup.
    pub fn start(self: &Arc<Self>, outbox: Outbox, refresh_interval: Duration) -> AgentTasks {
        let refresher = tokio::spawn(Arc::clone(self).run_refresher(refresh_interval));
        let sender = tokio::spawn(Arc::clone(self).run_sender(outbox));
        AgentTasks { refresher, sender }
    }

    async fn run_refresher(self: Arc<Self>, refresh_interval: Duration) {
        let start = tokio::time::Instant::now() + refresh_interval;
        let mut ticker = tokio::time::interval_at(start, refresh_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh_tags().await {
                warn!(server = %self.server(), error = %e, "Failed to refresh followed tags, keeping previous set");
            }
        }
    }

    async fn run_sender(self: Arc<Self>, mut outbox: Outbox) {
        while let Some(uri) = outbox.next().await {
            if let Err(e) = self.api.resolve(&uri).await {
                warn!(server = %self.server(), uri = %uri, error = %e, "Failed to resolve post");
            }
        }
    }
}
