// Post ingest: from one update payload to the tag router.
//
// Called synchronously by every stream worker. The dedup window and the
// statistics counters share a single mutex; nothing inside the critical
// section awaits, and routing only pushes onto unbounded queues.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::debug;

use crate::dedup::DedupCache;
use crate::extract;
use crate::router::TagRouter;
use crate::stats::Stats;

/// What happened to a payload handed to [`PostIngest::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// No `uri` field (or a null one); nothing to do.
    NoUri,
    /// Already seen within the dedup window.
    Duplicate,
    /// Author opted out of indexing (`noindex` or `#nobot`); counted only.
    OptedOut,
    /// New post without tags; counted only.
    Untagged,
    /// New tagged post, enqueued for this many users.
    Routed(usize),
}

struct IngestState {
    seen: DedupCache,
    stats: Stats,
}

/// The shared ingest pipeline for all stream workers.
pub struct PostIngest {
    state: Mutex<IngestState>,
    router: TagRouter,
}

/// Host segment of a post URI, used for per-server statistics.
pub fn origin_server(uri: &str) -> &str {
    let without_scheme = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    without_scheme.split('/').next().unwrap_or(without_scheme)
}

/// Lowercased tag names of a status payload.
pub fn post_tags(payload: &[u8]) -> HashSet<String> {
    extract::name_list_field(payload, extract::TAGS_LABEL)
        .into_iter()
        .map(|tag| String::from_utf8_lossy(tag).to_lowercase())
        .collect()
}

fn opted_out(payload: &[u8]) -> bool {
    extract::contains(payload, b"\"noindex\":true") || extract::contains(payload, b"#nobot")
}

impl PostIngest {
    pub fn new(router: TagRouter, dedup_capacity: usize) -> Self {
        Self {
            state: Mutex::new(IngestState {
                seen: DedupCache::new(dedup_capacity),
                stats: Stats::default(),
            }),
            router,
        }
    }

    pub fn router(&self) -> &TagRouter {
        &self.router
    }

    /// Process one update payload.
    pub fn ingest(&self, payload: &[u8]) -> IngestOutcome {
        let Some((uri, _)) = extract::string_field(payload, extract::URI_LABEL, 0) else {
            return IngestOutcome::NoUri;
        };
        let uri = String::from_utf8_lossy(uri);

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if !state.seen.insert_if_new(&uri) {
            return IngestOutcome::Duplicate;
        }
        state.stats.record_post(origin_server(&uri));

        if opted_out(payload) {
            debug!(uri = %uri, "Post opted out of indexing");
            return IngestOutcome::OptedOut;
        }

        let tags = post_tags(payload);
        if tags.is_empty() {
            return IngestOutcome::Untagged;
        }

        let deliveries = self.router.route(&tags, &uri);
        state.stats.record_forwarded(deliveries);
        IngestOutcome::Routed(deliveries)
    }

    /// Take the counters accumulated so far, resetting them.
    pub fn take_stats(&self) -> Stats {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut state.stats)
    }

    /// Number of post ids currently in the dedup window.
    pub fn dedup_len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .seen
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_server_strips_scheme_and_path() {
        assert_eq!(
            origin_server("https://example.social/users/x/statuses/1"),
            "example.social"
        );
        assert_eq!(origin_server("http://localhost:3000/notes/9"), "localhost:3000");
        assert_eq!(origin_server("example.social/abc"), "example.social");
    }

    #[test]
    fn test_post_tags_lowercased_and_deduplicated() {
        let payload = br#"{"uri":"https://a.example/1","tags":[{"name":"Rust","url":"u"},{"name":"rust","url":"u"},{"name":"Tokio","url":"u"}]}"#;
        let tags = post_tags(payload);
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("rust"));
        assert!(tags.contains("tokio"));
    }

    #[test]
    fn test_payload_without_uri_is_ignored() {
        let ingest = PostIngest::new(TagRouter::new(Vec::new()), 10);
        assert_eq!(ingest.ingest(b"{\"uri\":null,\"tags\":[]}"), IngestOutcome::NoUri);
        assert_eq!(ingest.ingest(b"\"109876543\""), IngestOutcome::NoUri);
        assert_eq!(ingest.dedup_len(), 0);
        assert_eq!(ingest.take_stats().posts, 0);
    }

    #[test]
    fn test_duplicate_counted_once() {
        let ingest = PostIngest::new(TagRouter::new(Vec::new()), 10);
        let payload = br#"{"uri":"https://a.example/statuses/1","tags":[]}"#;
        assert_eq!(ingest.ingest(payload), IngestOutcome::Untagged);
        assert_eq!(ingest.ingest(payload), IngestOutcome::Duplicate);

        let stats = ingest.take_stats();
        assert_eq!(stats.posts, 1);
        assert_eq!(stats.per_server.get("a.example"), Some(&1));
        assert_eq!(ingest.take_stats(), Stats::default());
    }

    #[test]
    fn test_opted_out_posts_are_counted_not_routed() {
        let ingest = PostIngest::new(TagRouter::new(Vec::new()), 10);
        let noindex = br#"{"uri":"https://a.example/1","account":{"noindex":true},"tags":[{"name":"rust"}]}"#;
        let nobot = br#"{"uri":"https://a.example/2","content":"<p>hi #nobot</p>","tags":[{"name":"rust"}]}"#;
        assert_eq!(ingest.ingest(noindex), IngestOutcome::OptedOut);
        assert_eq!(ingest.ingest(nobot), IngestOutcome::OptedOut);
        assert_eq!(ingest.take_stats().posts, 2);
    }
}
