//! Day-granularity simulation time.
//!
//! The engine steps in whole days, so its calendar unit is a `SimDate`: a
//! plain day index from an arbitrary simulation epoch. Dates are totally
//! ordered and support whole-day offset arithmetic, which is everything the
//! driver, the event calendar, and the statistics sink require.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::{Add, AddAssign, Sub};

/// A discrete day-granularity timestamp.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct SimDate(pub u32);

impl SimDate {
    #[must_use]
    pub fn new(day: u32) -> SimDate {
        SimDate(day)
    }

    /// The day index from the simulation epoch.
    #[must_use]
    pub fn day(self) -> u32 {
        self.0
    }

    /// Number of whole days from `earlier` to `self`.
    ///
    /// # Panics
    ///
    /// Panics if `earlier` is after `self`.
    #[must_use]
    pub fn days_since(self, earlier: SimDate) -> u32 {
        assert!(
            earlier <= self,
            "days_since called with a later date: {earlier} > {self}"
        );
        self.0 - earlier.0
    }

    /// Day of the simulation week, `0..=6`. Used only for periodic logging.
    #[must_use]
    pub fn day_of_week(self) -> u32 {
        self.0 % 7
    }
}

impl Add<u32> for SimDate {
    type Output = SimDate;

    fn add(self, days: u32) -> SimDate {
        SimDate(self.0 + days)
    }
}

impl AddAssign<u32> for SimDate {
    fn add_assign(&mut self, days: u32) {
        self.0 += days;
    }
}

impl Sub<u32> for SimDate {
    type Output = SimDate;

    fn sub(self, days: u32) -> SimDate {
        SimDate(self.0 - days)
    }
}

impl Display for SimDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "day {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::SimDate;

    #[test]
    fn ordering_and_arithmetic() {
        let start = SimDate::new(10);
        assert!(start < start + 1);
        assert_eq!(start + 5, SimDate::new(15));
        assert_eq!(start - 3, SimDate::new(7));
        assert_eq!((start + 5).days_since(start), 5);
    }

    #[test]
    fn add_assign_advances_one_day() {
        let mut date = SimDate::new(0);
        for _ in 0..4 {
            date += 1;
        }
        assert_eq!(date, SimDate::new(4));
    }

    #[test]
    #[should_panic(expected = "days_since called with a later date")]
    fn days_since_rejects_reversed_order() {
        SimDate::new(3).days_since(SimDate::new(4));
    }

    #[test]
    fn display_format() {
        assert_eq!(SimDate::new(12).to_string(), "day 12");
    }
}
