pub mod builder;
pub mod config;
pub mod detector;
pub mod error;

pub use builder::HarrisBuilder;
pub use config::HarrisConfig;
pub use detector::HarrisDetector;
pub use error::{HarrisError, HarrisResult};
