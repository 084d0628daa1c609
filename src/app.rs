// Application context: everything that lives for the whole process.
//
// Built once at startup from the configuration and the parsed server and
// user lists, then run forever.

use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Config, UserEntry};
use crate::ingest::PostIngest;
use crate::router::TagRouter;
use crate::stats;
use crate::stream::worker::ServerStream;
use crate::user::agent::{AgentTasks, Outbox, UserAgent};
use crate::user::client::{HomeServer, HomeServerClient};

/// Number of users whose tags are fetched concurrently at startup.
const STARTUP_CONCURRENCY: usize = 8;

pub struct App {
    config: Config,
    ingest: Arc<PostIngest>,
    streams: Vec<Arc<ServerStream>>,
    outboxes: Vec<Outbox>,
}

impl App {
    /// Build the context from HTTP-backed home server clients.
    pub fn new(config: Config, servers: &[String], users: &[UserEntry]) -> Result<Self> {
        let apis = users
            .iter()
            .map(|user| {
                HomeServerClient::new(&user.server, &user.token, config.request_timeout)
                    .map(|client| Arc::new(client) as Arc<dyn HomeServer>)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::with_home_servers(config, servers, apis)
    }

    /// Build the context around existing home server implementations.
    pub fn with_home_servers(
        config: Config,
        servers: &[String],
        home_servers: Vec<Arc<dyn HomeServer>>,
    ) -> Result<Self> {
        let (agents, outboxes): (Vec<_>, Vec<_>) =
            home_servers.into_iter().map(UserAgent::new).unzip();

        let ingest = Arc::new(PostIngest::new(
            TagRouter::new(agents),
            config.dedup_capacity,
        ));

        let streams = servers
            .iter()
            .map(|server| ServerStream::new(server, &config).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            ingest,
            streams,
            outboxes,
        })
    }

    /// Fetch every user's followed tags, start their tasks, then start the
    /// stream workers. Returns the handles of all spawned tasks.
    pub async fn start(self) -> (Arc<PostIngest>, Vec<JoinHandle<()>>) {
        let agents: Vec<Arc<UserAgent>> = self.ingest.router().agents().to_vec();

        let refreshed: Vec<_> = stream::iter(agents.iter().map(|agent| async move {
            (agent.server().to_string(), agent.refresh_tags().await)
        }))
        .buffer_unordered(STARTUP_CONCURRENCY)
        .collect()
        .await;

        for (server, result) in refreshed {
            if let Err(e) = result {
                warn!(server = %server, error = %e, "Initial followed tags fetch failed");
            }
        }

        let mut handles = Vec::new();
        for (agent, outbox) in agents.iter().zip(self.outboxes) {
            let AgentTasks { refresher, sender } =
                agent.start(outbox, self.config.tag_refresh_interval);
            handles.push(refresher);
            handles.push(sender);
        }

        for server in &self.streams {
            handles.push(tokio::spawn(
                Arc::clone(server).run(Arc::clone(&self.ingest)),
            ));
        }

        info!(
            users = agents.len(),
            servers = self.streams.len(),
            "All streams and user agents started"
        );

        (self.ingest, handles)
    }

    /// Start everything and report stats forever.
    pub async fn run(self) -> Result<()> {
        let stats_interval = self.config.stats_interval;
        let (ingest, _handles) = self.start().await;
        stats::run_reporter(ingest, stats_interval).await;
        Ok(())
    }
}
