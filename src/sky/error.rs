use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SolarError {
    #[error("sun never rises on {date} (polar night)")]
    NeverRises { date: NaiveDate },
    #[error("sun never sets on {date} (midnight sun)")]
    NeverSets { date: NaiveDate },
    #[error("solar event out of representable range")]
    OutOfRange,
}
