pub mod types;
pub mod error;
pub mod config;
pub mod market;
pub mod aggregation;
pub mod process;
pub mod events;
pub mod metrics;
pub mod server;
pub mod utils;

pub use types::*;
pub use error::{FeedError, Result};
