// tagfinder: bring posts with followed tags into users' home feeds.
//
// This is the library root. Public streams from many servers flow through
// `stream` and `ingest`, get fanned out by `router`, and are delivered by
// the per-user agents in `user`.

pub mod app;
pub mod config;
pub mod dedup;
pub mod extract;
pub mod ingest;
pub mod router;
pub mod stats;
pub mod stream;
pub mod user;
