// Tag router: fan-out of tagged posts to every interested user.

use std::collections::HashSet;
use std::sync::Arc;

use crate::user::agent::UserAgent;

/// The fixed set of user agents registered at startup.
pub struct TagRouter {
    agents: Vec<Arc<UserAgent>>,
}

impl TagRouter {
    pub fn new(agents: Vec<Arc<UserAgent>>) -> Self {
        Self { agents }
    }

    pub fn agents(&self) -> &[Arc<UserAgent>] {
        &self.agents
    }

    /// Offer a post to every agent. Returns how many enqueued it.
    pub fn route(&self, tags: &HashSet<String>, uri: &str) -> usize {
        self.agents
            .iter()
            .filter(|agent| agent.offer(tags, uri))
            .count()
    }
}
