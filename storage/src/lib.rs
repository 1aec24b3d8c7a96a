mod config_store;
mod dedup_store;

pub use config_store::ConfigStore;
pub use dedup_store::DedupStore;
