//! Wall-clock adapter.
//!
//! Implements [`ClockPort`] by shifting UTC by a fixed offset.  The
//! shift goes through `chrono`, so the date rolls over correctly when the
//! offset pushes the hour past midnight.
//!
//! On ESP-IDF the system clock is set by SNTP (started from `main`);
//! until the first sync it reports 1970 and [`SystemClock::is_synced`]
//! returns `false`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};

use crate::app::ports::ClockPort;

/// Anything earlier than 2020-01-01 means the clock was never set.
const EPOCH_2020: i64 = 1_577_836_800;

pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(utc_offset_hours: i8) -> Self {
        let offset = FixedOffset::east_opt(i32::from(utc_offset_hours) * 3600).unwrap_or(Utc.fix());
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn is_synced(&self) -> bool {
        Utc::now().timestamp() >= EPOCH_2020
    }

    /// Local time for a given UTC instant.
    pub fn localize(&self, utc: DateTime<Utc>) -> NaiveDateTime {
        utc.with_timezone(&self.offset).naive_local()
    }
}

impl ClockPort for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        self.localize(Utc::now())
    }
}
