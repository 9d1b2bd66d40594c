pub mod cache;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod grouping;
pub mod input;
pub mod names;
pub mod output;
pub mod period;
pub mod statistic;
pub mod summary;
