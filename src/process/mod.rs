pub mod manager;

pub use manager::{PollManager, Snapshot, StartOutcome};
