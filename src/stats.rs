// Post statistics: per-server counts and the periodic report.
//
// Counters are owned by the ingest pipeline (behind its mutex). The reporter
// takes a snapshot every interval, which also resets them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tracing::info;

use crate::ingest::PostIngest;

/// Number of servers listed in each report.
pub const TOP_SERVERS: usize = 10;

/// Counters accumulated since the last report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    /// New (non-duplicate) posts seen.
    pub posts: u64,
    /// Posts enqueued for delivery, counted once per matching user.
    pub forwarded: u64,
    /// New posts per origin server.
    pub per_server: HashMap<String, u64>,
}

impl Stats {
    pub fn record_post(&mut self, server: &str) {
        self.posts += 1;
        *self.per_server.entry(server.to_string()).or_default() += 1;
    }

    pub fn record_forwarded(&mut self, deliveries: usize) {
        self.forwarded += deliveries as u64;
    }

    /// The `n` busiest servers, highest count first. Ties sort by name, descending.
    pub fn top_servers(&self, n: usize) -> Vec<(&str, u64)> {
        let mut servers: Vec<(&str, u64)> = self
            .per_server
            .iter()
            .map(|(server, count)| (server.as_str(), *count))
            .collect();
        servers.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(a.0)));
        servers.truncate(n);
        servers
    }
}

/// Print a report for one interval to the terminal.
pub fn print_report(stats: &Stats) {
    println!(
        "{}: {} {}  {} {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "Posts:".bold(),
        stats.posts,
        "Forwarded:".bold(),
        stats.forwarded,
    );
    println!("{}", "Top posting servers:".bold());
    for (server, count) in stats.top_servers(TOP_SERVERS) {
        println!("  {server} : {count}");
    }
}

/// Report and reset the counters every `interval`, forever.
pub async fn run_reporter(ingest: Arc<PostIngest>, interval: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    loop {
        ticker.tick().await;
        let stats = ingest.take_stats();
        info!(
            posts = stats.posts,
            forwarded = stats.forwarded,
            servers = stats.per_server.len(),
            "Stats interval complete"
        );
        print_report(&stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_servers_sorted_descending() {
        let mut stats = Stats::default();
        for _ in 0..3 {
            stats.record_post("mastodon.social");
        }
        stats.record_post("fosstodon.org");
        for _ in 0..2 {
            stats.record_post("hachyderm.io");
        }

        let top = stats.top_servers(2);
        assert_eq!(top, vec![("mastodon.social", 3), ("hachyderm.io", 2)]);
        assert_eq!(stats.posts, 6);
    }

    #[test]
    fn test_top_servers_ties_sort_by_name_descending() {
        let mut stats = Stats::default();
        stats.record_post("alpha.example");
        stats.record_post("gamma.example");
        stats.record_post("beta.example");
        stats.record_post("beta.example");

        let top = stats.top_servers(3);
        assert_eq!(
            top,
            vec![("beta.example", 2), ("gamma.example", 1), ("alpha.example", 1)]
        );
    }

    #[test]
    fn test_top_servers_limits_to_n() {
        let mut stats = Stats::default();
        for i in 0..15 {
            stats.record_post(&format!("server{i}.example"));
        }
        assert_eq!(stats.top_servers(TOP_SERVERS).len(), TOP_SERVERS);
    }

    #[test]
    fn test_forwarded_counts_deliveries() {
        let mut stats = Stats::default();
        stats.record_forwarded(2);
        stats.record_forwarded(0);
        stats.record_forwarded(1);
        assert_eq!(stats.forwarded, 3);
    }
}
