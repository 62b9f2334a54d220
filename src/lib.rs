pub mod config;
pub mod encode;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod observability;
pub mod schema;
pub mod storage;

// Wires the stages above into the one-shot pipeline.
pub mod extractor;
