use serde::{Deserialize, Serialize};

use super::travel_cost_matrix::Time;

/// Arrival bounds of a node. Missing bounds are unconstrained.
#[derive(Deserialize, Debug, Serialize, Clone, Copy, PartialEq, Default)]
pub struct TimeWindow {
    earliest: Option<Time>,
    latest: Option<Time>,
}

impl TimeWindow {
    pub fn new(earliest: Option<Time>, latest: Option<Time>) -> Self {
        TimeWindow { earliest, latest }
    }

    pub fn earliest(&self) -> Option<Time> {
        self.earliest
    }

    pub fn latest(&self) -> Option<Time> {
        self.latest
    }

    pub fn is_empty(&self) -> bool {
        self.earliest.is_none() && self.latest.is_none()
    }

    /// Service starts at the arrival time, or waits for the window to open.
    pub fn service_start(&self, arrival: Time) -> Time {
        match self.earliest {
            Some(earliest) => arrival.max(earliest),
            None => arrival,
        }
    }

    pub fn is_satisfied(&self, arrival: Time) -> bool {
        match self.latest {
            Some(latest) => arrival <= latest,
            None => true,
        }
    }

    pub fn lateness(&self, arrival: Time) -> Time {
        match self.latest {
            Some(latest) => (arrival - latest).max(0.0),
            None => 0.0,
        }
    }
}

#[derive(Default)]
pub struct TimeWindowBuilder {
    earliest: Option<Time>,
    latest: Option<Time>,
}

impl TimeWindowBuilder {
    pub fn with_earliest(mut self, earliest: Time) -> Self {
        self.earliest = Some(earliest);
        self
    }

    pub fn with_latest(mut self, latest: Time) -> Self {
        self.latest = Some(latest);
        self
    }

    pub fn build(self) -> TimeWindow {
        TimeWindow {
            earliest: self.earliest,
            latest: self.latest,
        }
    }
}
