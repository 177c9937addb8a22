use std::fmt;

use chrono::{Duration, NaiveDateTime};

/// how `fire_at` is written to disk
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// how long (in seconds) before an alarm the pre-alarm vibration may fire
pub const PRE_ALARM_WINDOW_SECS: i64 = 60;

/// the pre-alarm ignores the alarm's own settings
pub const PRE_ALARM_INTENSITY: u8 = 100;
pub const PRE_ALARM_DURATION_MS: u32 = 5000;

/// represents an alarm
/// the name is not stored here, it is the key the alarm is saved under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRecord {
    /// the next time the alarm goes off, not a recurrence rule
    pub fire_at: NaiveDateTime,
    pub intensity: u8,
    pub duration_ms: u32,
    /// fire a vibration during the minute before `fire_at`
    pub vibrate_before: bool,
}

impl AlarmRecord {
    #[must_use]
    pub const fn new(
        fire_at: NaiveDateTime,
        intensity: u8,
        duration_ms: u32,
        vibrate_before: bool,
    ) -> Self {
        Self {
            fire_at,
            intensity,
            duration_ms,
            vibrate_before,
        }
    }

    /// true while `now` is in `[fire_at - 60s, fire_at)`
    #[must_use]
    pub fn pre_alarm_due(&self, now: NaiveDateTime) -> bool {
        self.vibrate_before
            && now >= self.fire_at - Duration::seconds(PRE_ALARM_WINDOW_SECS)
            && now < self.fire_at
    }

    #[must_use]
    pub fn main_due(&self, now: NaiveDateTime) -> bool {
        now >= self.fire_at
    }

    /// the same alarm one day later
    /// always exactly 24 hours, even if that is still in the past
    #[must_use]
    pub fn next_occurrence(&self) -> Self {
        Self {
            fire_at: self.fire_at + Duration::days(1),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        f64::from(self.duration_ms) / 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// low impact vibration a minute before the alarm
    PreAlarm,
    Main,
}

impl EventKind {
    /// the `type` tag the trigger API expects
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::PreAlarm => "Vibrate",
            Self::Main => "Shock",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreAlarm => write!(f, "pre-alarm"),
            Self::Main => write!(f, "alarm"),
        }
    }
}

/// one fire of one alarm, only lives for the tick that created it
#[derive(Debug, Clone, Copy)]
pub struct FiringEvent<'a> {
    pub name: &'a str,
    pub record: &'a AlarmRecord,
    pub kind: EventKind,
    pub at: NaiveDateTime,
}

impl<'a> FiringEvent<'a> {
    #[must_use]
    pub const fn new(
        name: &'a str,
        record: &'a AlarmRecord,
        kind: EventKind,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            name,
            record,
            kind,
            at,
        }
    }

    #[must_use]
    pub const fn intensity(&self) -> u8 {
        match self.kind {
            EventKind::PreAlarm => PRE_ALARM_INTENSITY,
            EventKind::Main => self.record.intensity,
        }
    }

    #[must_use]
    pub const fn duration_ms(&self) -> u32 {
        match self.kind {
            EventKind::PreAlarm => PRE_ALARM_DURATION_MS,
            EventKind::Main => self.record.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn pre_alarm_window_is_half_open() {
        let wake = AlarmRecord::new(at(8, 0, 0), 50, 2000, true);
        assert!(!wake.pre_alarm_due(at(7, 58, 59)));
        assert!(wake.pre_alarm_due(at(7, 59, 0)));
        assert!(wake.pre_alarm_due(at(7, 59, 59)));
        assert!(!wake.pre_alarm_due(at(8, 0, 0)));
    }

    #[test]
    fn pre_alarm_needs_vibrate_flag() {
        let wake = AlarmRecord::new(at(8, 0, 0), 50, 2000, false);
        assert!(!wake.pre_alarm_due(at(7, 59, 30)));
    }

    #[test]
    fn main_due_from_fire_time_on() {
        let wake = AlarmRecord::new(at(8, 0, 0), 50, 2000, false);
        assert!(!wake.main_due(at(7, 59, 59)));
        assert!(wake.main_due(at(8, 0, 0)));
        assert!(wake.main_due(at(23, 0, 0)));
    }

    #[test]
    fn next_occurrence_adds_one_day() {
        let wake = AlarmRecord::new(at(8, 0, 0), 50, 2000, true);
        let next = wake.next_occurrence();
        assert_eq!(next.fire_at, at(8, 0, 0) + Duration::days(1));
        assert_eq!(next.intensity, 50);
        assert_eq!(next.duration_ms, 2000);
        assert!(next.vibrate_before);
    }

    #[test]
    fn pre_alarm_uses_fixed_settings() {
        let wake = AlarmRecord::new(at(8, 0, 0), 50, 2000, true);
        let pre = FiringEvent::new("Wake", &wake, EventKind::PreAlarm, at(7, 59, 30));
        assert_eq!(pre.intensity(), PRE_ALARM_INTENSITY);
        assert_eq!(pre.duration_ms(), PRE_ALARM_DURATION_MS);
        assert_eq!(pre.kind.tag(), "Vibrate");

        let main = FiringEvent::new("Wake", &wake, EventKind::Main, at(8, 0, 5));
        assert_eq!(main.intensity(), 50);
        assert_eq!(main.duration_ms(), 2000);
        assert_eq!(main.kind.tag(), "Shock");
    }
}
