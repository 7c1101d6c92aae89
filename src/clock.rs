//! Time source used for due-instant arithmetic.
//!
//! Tasks carry local wall-clock due dates, but timers run on real elapsed
//! time. A [`Clock`] supplies the current instant and converts between the
//! two, so a daylight-saving change between arming and firing does not
//! shift the reminder.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use std::sync::Mutex;

/// Source of the current instant and of the local time zone rules.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Local wall-clock time at `instant`.
    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime;

    /// The instant a local wall-clock time refers to.
    ///
    /// An ambiguous time (clocks turned back) resolves to the earlier
    /// instant. A time skipped by clocks jumping forward is read with the
    /// offset in force before the jump, which lands just past the gap
    /// (02:30 in a 02:00 to 03:00 gap becomes 03:30).
    fn resolve_local(&self, local: NaiveDateTime) -> DateTime<Utc>;

    /// Current local wall-clock time.
    fn local_now(&self) -> NaiveDateTime {
        self.to_local(self.now())
    }
}

fn utc_from_local(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    (local - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

/// The host's clock and time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&Local).naive_local()
    }

    fn resolve_local(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match Local.from_local_datetime(&local).earliest() {
            Some(instant) => instant.with_timezone(&Utc),
            None => {
                let before = Local.offset_from_utc_datetime(&(local - TimeDelta::days(1)));
                utc_from_local(local, before)
            }
        }
    }
}

/// Offset rules for a [`ManualClock`]: a fixed offset, optionally switching
/// to another one at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualZone {
    before: FixedOffset,
    change: Option<(DateTime<Utc>, FixedOffset)>,
}

impl ManualZone {
    pub fn utc() -> Self {
        Self::fixed(Utc.fix())
    }

    pub fn fixed(offset: FixedOffset) -> Self {
        Self {
            before: offset,
            change: None,
        }
    }

    /// `before` until `at`, `after` from then on.
    pub fn with_change(before: FixedOffset, at: DateTime<Utc>, after: FixedOffset) -> Self {
        Self {
            before,
            change: Some((at, after)),
        }
    }

    fn offset_at(&self, instant: DateTime<Utc>) -> FixedOffset {
        match self.change {
            Some((at, after)) if instant >= at => after,
            _ => self.before,
        }
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        let offset = self.offset_at(instant);
        instant.naive_utc() + TimeDelta::seconds(i64::from(offset.local_minus_utc()))
    }

    fn resolve(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let offsets = std::iter::once(self.before).chain(self.change.map(|(_, after)| after));
        offsets
            .map(|offset| (offset, utc_from_local(local, offset)))
            .filter(|(offset, instant)| self.offset_at(*instant) == *offset)
            .map(|(_, instant)| instant)
            .min()
            .unwrap_or_else(|| utc_from_local(local, self.before))
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and simulations together with a paused tokio clock.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    zone: ManualZone,
}

impl ManualClock {
    /// Create a UTC clock frozen at wall time `local`.
    pub fn new(local: NaiveDateTime) -> Self {
        Self::in_zone(local.and_utc(), ManualZone::utc())
    }

    /// Create a clock frozen at `now` with the given offset rules.
    pub fn in_zone(now: DateTime<Utc>, zone: ManualZone) -> Self {
        Self {
            now: Mutex::new(now),
            zone,
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        self.zone.to_local(instant)
    }

    fn resolve_local(&self, local: NaiveDateTime) -> DateTime<Utc> {
        self.zone.resolve(local)
    }
}
