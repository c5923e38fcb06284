use crate::activity::IndexSource;
use crate::journal::{Event, Journal};

/// Classifies the activity index against a threshold.
#[derive(Debug)]
pub struct ActivityOracle<S> {
    source: S,
    threshold: f64,
}

impl<S: IndexSource> ActivityOracle<S> {
    pub fn new(source: S, threshold: f64) -> Self {
        Self { source, threshold }
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// True only when the index is strictly above the threshold. A feed
    /// that cannot be read counts as quiet; the next poll tries again.
    pub async fn index_is_high(&self, journal: &dyn Journal) -> bool {
        match self.source.fetch_index().await {
            Ok(value) if value > self.threshold => {
                journal.record(Event::IndexHigh { value });
                true
            }
            Ok(value) => {
                journal.record(Event::IndexLow { value });
                false
            }
            Err(e) => {
                journal.record(Event::FeedUnavailable {
                    cause: e.to_string(),
                });
                false
            }
        }
    }
}
