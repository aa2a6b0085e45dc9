pub mod call_tracker;
pub mod reporter;

pub use call_tracker::CallTracker;
pub use reporter::spawn_reporter;
