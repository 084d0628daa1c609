// Public streaming API ingestion.

pub mod frames;
pub mod worker;
