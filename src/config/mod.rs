pub mod loader;

pub use loader::{load_config, load_or_default, API_KEY_ENV};
