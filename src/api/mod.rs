pub mod client;
pub mod parse;
pub mod source;

pub use client::{ApiError, FootballApiClient};
pub use source::FootballDataSource;
