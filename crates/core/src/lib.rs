#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod text;
pub mod time;
pub mod weighting;

pub use error::Error;
pub use time::Clock;
pub use weighting::WeightPolicy;
