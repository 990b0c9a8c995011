//! Time interval conventions used to annualize or rescale return-based
//! metrics.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// A period of time a metric was computed over, expressed as a
/// [`TimeDelta`] so different conventions (calendar day, trading year) can
/// be compared and rescaled against each other.
pub trait TimeInterval: Clone + PartialEq {
    fn interval(&self) -> TimeDelta;
}

impl TimeInterval for TimeDelta {
    fn interval(&self) -> TimeDelta {
        *self
    }
}

/// One calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Daily;

impl TimeInterval for Daily {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(1)
    }
}

/// A trading year of 252 business days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Annual252;

impl TimeInterval for Annual252 {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(252)
    }
}

/// A calendar year of 365 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Annual365;

impl TimeInterval for Annual365 {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(365)
    }
}
