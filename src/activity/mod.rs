mod client;
mod error;
mod feed;
mod oracle;

pub use client::{FeedClient, IndexSource};
pub use error::FetchError;
pub use feed::FeedFormat;
pub use oracle::ActivityOracle;

/// BGS three-hourly Kp estimate for the UK.
pub const DEFAULT_FEED_URL: &str =
    "http://www.geomag.bgs.ac.uk/data_service/space_weather/current/3hrKuk.json";
/// Kp above this is active or stormy.
pub const DEFAULT_THRESHOLD: f64 = 5.0;
