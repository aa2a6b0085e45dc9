pub mod fingerprint;

pub use fingerprint::batch_fingerprint;
