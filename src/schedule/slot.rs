use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::journal::{Event, Journal};
use crate::schedule::Timer;

pub const DEFAULT_SLOT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A slot closer than this is skipped in favour of the one after it.
const MIN_WAIT: Duration = Duration::from_secs(5);

/// Start of the slot after the one containing `now`, on a grid of
/// `interval` aligned to the Unix epoch. Always later than `now` and at most
/// one interval away.
pub fn next_slot(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let step = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX).max(1);
    let target = now.timestamp_millis().saturating_add(step);
    let floored = target - target.rem_euclid(step);
    DateTime::from_timestamp_millis(floored).unwrap_or(now)
}

/// Sleeps until the next slot and returns it. A poll that ran up to the
/// boundary waits for the following slot rather than re-polling at once,
/// so the wait is at least `min(5s, interval / 2)`.
pub async fn wait_for_next_slot(
    timer: &impl Timer,
    interval: Duration,
    journal: &dyn Journal,
) -> DateTime<Utc> {
    let now = timer.now();
    let mut until = next_slot(now, interval);
    if (until - now).to_std().unwrap_or(Duration::ZERO) < MIN_WAIT.min(interval / 2) {
        until = next_slot(until, interval);
    }
    let delay = (until - now).to_std().unwrap_or(Duration::ZERO);
    journal.record(Event::Waiting { until, delay });
    timer.sleep(delay).await;
    until
}
