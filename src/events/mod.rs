pub mod types;
pub mod sink;
pub mod publisher;

pub use types::EventEnvelope;
pub use sink::{EventSink, HttpEventSink};
pub use publisher::EventPublisher;
