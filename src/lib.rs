pub mod api;
pub mod classifier;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod fetcher;
pub mod normalize;
pub mod types;

pub use classifier::{Classifier, KeywordRules};
pub use diff::{compare, compare_at, compare_with_details, MarketDetailSource};
pub use types::{ClassificationResult, EventAttributes, EventDifferenceRecord, Snapshot};
