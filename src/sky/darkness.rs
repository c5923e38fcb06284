use chrono::{DateTime, Utc};

use crate::journal::{Event, Journal};
use crate::sky::{next_sunrise, next_sunset, SolarError, Station};

/// Decides whether it is dark enough at the station for a long exposure.
#[derive(Debug, Clone, Copy)]
pub struct DarknessOracle {
    station: Station,
    horizon_deg: f64,
}

impl DarknessOracle {
    pub fn new(station: Station, horizon_deg: f64) -> Self {
        Self {
            station,
            horizon_deg,
        }
    }

    /// Takes the first sunrise and sunset after 00:00 UTC of `now`'s date.
    /// Normally `now` inside `[sunrise, sunset]` is day. Far from Greenwich
    /// the sunset comes first (the local day straddles midnight UTC), and
    /// day is up to that sunset or from that sunrise on.
    pub fn is_dark(&self, now: DateTime<Utc>, journal: &dyn Journal) -> Result<bool, SolarError> {
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .ok_or(SolarError::OutOfRange)?
            .and_utc();
        let sunrise = next_sunrise(&self.station, midnight, self.horizon_deg)?;
        let sunset = next_sunset(&self.station, midnight, self.horizon_deg)?;

        let day = if sunrise <= sunset {
            sunrise <= now && now <= sunset
        } else {
            now <= sunset || sunrise <= now
        };
        if day {
            journal.record(Event::Day);
            Ok(false)
        } else {
            journal.record(Event::Dark);
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::testing::MemoryJournal;
    use chrono::{Duration, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn oracle() -> DarknessOracle {
        DarknessOracle::new(Station::default(), 0.0)
    }

    #[test]
    fn midday_is_day() {
        let journal = MemoryJournal::default();
        assert!(!oracle().is_dark(utc(2024, 12, 21, 12, 0), &journal).unwrap());
        assert_eq!(journal.events(), vec![Event::Day]);
    }

    #[test]
    fn night_either_side_of_the_day_is_dark() {
        let journal = MemoryJournal::default();
        assert!(oracle().is_dark(utc(2024, 12, 21, 2, 0), &journal).unwrap());
        assert!(oracle().is_dark(utc(2024, 12, 21, 18, 30), &journal).unwrap());
        assert!(oracle().is_dark(utc(2024, 6, 21, 23, 30), &journal).unwrap());
        assert_eq!(journal.events(), vec![Event::Dark; 3]);
    }

    #[test]
    fn boundaries_count_as_day() {
        let journal = MemoryJournal::default();
        let station = Station::default();
        let midnight = utc(2024, 9, 1, 0, 0);
        let sunrise = next_sunrise(&station, midnight, 0.0).unwrap();
        let sunset = next_sunset(&station, midnight, 0.0).unwrap();

        assert!(!oracle().is_dark(sunrise, &journal).unwrap());
        assert!(!oracle().is_dark(sunset, &journal).unwrap());
        assert!(oracle().is_dark(sunrise - Duration::seconds(1), &journal).unwrap());
        assert!(oracle().is_dark(sunset + Duration::seconds(1), &journal).unwrap());
    }

    #[test]
    fn west_of_greenwich_the_day_straddles_midnight_utc() {
        // Yellowknife, 2024-09-15: sunset ~01:58 UTC, sunrise ~13:13 UTC,
        // solar noon ~19:35 UTC.
        let yellowknife = DarknessOracle::new(
            Station {
                latitude_deg: 62.45,
                longitude_deg: -114.4,
            },
            0.0,
        );
        let journal = MemoryJournal::default();
        assert!(!yellowknife.is_dark(utc(2024, 9, 15, 18, 0), &journal).unwrap());
        assert!(!yellowknife.is_dark(utc(2024, 9, 15, 23, 30), &journal).unwrap());
        assert!(!yellowknife.is_dark(utc(2024, 9, 15, 1, 0), &journal).unwrap());
        assert!(yellowknife.is_dark(utc(2024, 9, 15, 3, 0), &journal).unwrap());
        assert!(yellowknife.is_dark(utc(2024, 9, 15, 8, 0), &journal).unwrap());
    }

    #[test]
    fn east_of_greenwich_the_day_straddles_midnight_utc() {
        // Sydney, 2024-12-21: sunset ~09:02 UTC, sunrise ~18:47 UTC.
        let sydney = DarknessOracle::new(
            Station {
                latitude_deg: -33.87,
                longitude_deg: 151.2,
            },
            0.0,
        );
        let journal = MemoryJournal::default();
        assert!(!sydney.is_dark(utc(2024, 12, 21, 3, 0), &journal).unwrap());
        assert!(!sydney.is_dark(utc(2024, 12, 21, 22, 0), &journal).unwrap());
        assert!(sydney.is_dark(utc(2024, 12, 21, 12, 0), &journal).unwrap());
    }

    #[test]
    fn polar_night_is_an_error() {
        let journal = MemoryJournal::default();
        let svalbard = DarknessOracle::new(
            Station {
                latitude_deg: 78.2,
                longitude_deg: 15.6,
            },
            0.0,
        );
        assert!(svalbard.is_dark(utc(2024, 12, 21, 12, 0), &journal).is_err());
        assert!(journal.events().is_empty());
    }
}
