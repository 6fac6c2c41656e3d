pub mod batcher;
pub mod external_id;
pub mod feed_parser;
pub mod fetcher;
pub mod importer;
pub mod normalizer;
pub mod queue;
pub mod run_tracker;
pub mod worker;
