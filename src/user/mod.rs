// Users whose home feeds receive matched posts.
//
// `client` talks to a user's home server; `agent` holds the followed tags
// and runs the per-user refresh and delivery tasks.

pub mod agent;
pub mod client;
