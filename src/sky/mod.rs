mod darkness;
mod error;
mod station;
mod sun;

pub use darkness::DarknessOracle;
pub use error::SolarError;
pub use station::Station;
pub use sun::{next_sunrise, next_sunset};
