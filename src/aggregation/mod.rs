pub mod fold;
pub mod aggregator;

pub use fold::{fold, AggregationMap};
pub use aggregator::{aggregate, Aggregation};
