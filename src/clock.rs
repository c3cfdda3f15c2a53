// ⏰ Clock - injected time source
// Epoch milliseconds drive coin accrual; the local calendar date drives the daily quota

use chrono::{Local, NaiveDate};
use std::cell::Cell;

pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;

    /// Current calendar day in the device's local zone
    fn today(&self) -> NaiveDate;
}

/// Date key stored in `last_reset_date`
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Local::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Hand-driven clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    millis: Cell<i64>,
    date: Cell<NaiveDate>,
}

impl ManualClock {
    pub fn new(millis: i64, date: NaiveDate) -> Self {
        ManualClock {
            millis: Cell::new(millis),
            date: Cell::new(date),
        }
    }

    pub fn advance_millis(&self, millis: i64) {
        self.millis.set(self.millis.get() + millis);
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.date.set(date);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.get()
    }

    fn today(&self) -> NaiveDate {
        self.date.get()
    }
}
