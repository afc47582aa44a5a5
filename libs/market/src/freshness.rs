use chrono::{Duration, NaiveDate};

use crate::model::{Observation, Payload, SourceResult};

/// Maximum age of an indicator's latest release, measured from the run date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    pub window: Duration,
    pub today: NaiveDate,
}

impl Freshness {
    pub fn new(window: Duration, today: NaiveDate) -> Self {
        Self { window, today }
    }

    pub fn is_fresh(&self, as_of: NaiveDate) -> bool {
        self.today.signed_duration_since(as_of) <= self.window
    }

    pub fn gate(&self, obs: Observation) -> SourceResult {
        if self.is_fresh(obs.as_of) {
            SourceResult::Ok(Payload::Observation(obs))
        } else {
            SourceResult::Stale {
                as_of: obs.as_of,
                threshold: self.window,
            }
        }
    }
}
