//! Sunrise and sunset from the standard sunrise equation.
//!
//! Accuracy is around a minute for mid latitudes, which is plenty for
//! deciding whether a six second exposure will be swamped by daylight.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::sky::{SolarError, Station};

const J2000_JD: f64 = 2_451_545.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const MILLIS_PER_DAY: f64 = 86_400_000.0;
/// `NaiveDate::num_days_from_ce` of 2000-01-01.
const J2000_DAYS_FROM_CE: i32 = 730_120;
/// TT - UT offset, in days.
const TERRESTRIAL_TIME_OFFSET: f64 = 0.0008;
const OBLIQUITY_DEG: f64 = 23.4397;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarDay {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl SolarDay {
    /// Rise and set around the solar transit of `date` at the station's
    /// meridian. `horizon_deg` is the altitude of the sun's centre that
    /// counts as rise/set; 0 is the geometric horizon.
    pub fn compute(
        station: &Station,
        date: NaiveDate,
        horizon_deg: f64,
    ) -> Result<Self, SolarError> {
        let n = f64::from(date.num_days_from_ce() - J2000_DAYS_FROM_CE) + TERRESTRIAL_TIME_OFFSET;
        let mean_noon = n - station.longitude_deg / 360.0;

        let anomaly = (357.5291 + 0.985_600_28 * mean_noon).rem_euclid(360.0).to_radians();
        let centre = 1.9148 * anomaly.sin()
            + 0.0200 * (2.0 * anomaly).sin()
            + 0.0003 * (3.0 * anomaly).sin();
        let ecliptic_lon = (anomaly.to_degrees() + centre + 180.0 + 102.9372)
            .rem_euclid(360.0)
            .to_radians();

        let transit =
            J2000_JD + mean_noon + 0.0053 * anomaly.sin() - 0.0069 * (2.0 * ecliptic_lon).sin();

        let sin_dec = ecliptic_lon.sin() * OBLIQUITY_DEG.to_radians().sin();
        let cos_dec = (1.0 - sin_dec * sin_dec).sqrt();
        let lat = station.lat_rad();

        let cos_hour_angle =
            (horizon_deg.to_radians().sin() - lat.sin() * sin_dec) / (lat.cos() * cos_dec);
        if cos_hour_angle > 1.0 {
            return Err(SolarError::NeverRises { date });
        }
        if cos_hour_angle < -1.0 {
            return Err(SolarError::NeverSets { date });
        }
        let half_day = cos_hour_angle.acos().to_degrees() / 360.0;

        Ok(Self {
            sunrise: julian_to_utc(transit - half_day)?,
            sunset: julian_to_utc(transit + half_day)?,
        })
    }
}

/// First sunrise at or after `from`.
pub fn next_sunrise(
    station: &Station,
    from: DateTime<Utc>,
    horizon_deg: f64,
) -> Result<DateTime<Utc>, SolarError> {
    next_event(station, from, horizon_deg, |day| day.sunrise)
}

/// First sunset at or after `from`.
pub fn next_sunset(
    station: &Station,
    from: DateTime<Utc>,
    horizon_deg: f64,
) -> Result<DateTime<Utc>, SolarError> {
    next_event(station, from, horizon_deg, |day| day.sunset)
}

fn next_event(
    station: &Station,
    from: DateTime<Utc>,
    horizon_deg: f64,
    pick: impl Fn(&SolarDay) -> DateTime<Utc>,
) -> Result<DateTime<Utc>, SolarError> {
    // Transit lies within +-12h of noon UTC, so the event following `from`
    // belongs to the previous, current or next calendar day.
    let date = from.date_naive();
    let mut last_err = SolarError::OutOfRange;
    for offset in [-1, 0, 1, 2] {
        let Some(day) = date.checked_add_signed(Duration::days(offset)) else {
            continue;
        };
        match SolarDay::compute(station, day, horizon_deg) {
            Ok(solar) if pick(&solar) >= from => return Ok(pick(&solar)),
            Ok(_) => {}
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

fn julian_to_utc(jd: f64) -> Result<DateTime<Utc>, SolarError> {
    let millis = ((jd - UNIX_EPOCH_JD) * MILLIS_PER_DAY).round();
    if !millis.is_finite() {
        return Err(SolarError::OutOfRange);
    }
    DateTime::from_timestamp_millis(millis as i64).ok_or(SolarError::OutOfRange)
}
