#[path = "integration/fixtures/mod.rs"]
mod fixtures;

#[path = "integration/cache.rs"]
mod cache;
#[path = "integration/fetch.rs"]
mod fetch;
#[path = "integration/optimistic.rs"]
mod optimistic;
#[path = "integration/streaming.rs"]
mod streaming;
