use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::Deserialize;

use crate::{alarm::AlarmRecord, error::ValidationError};

/// the highest intensity the shocker accepts
pub const MAX_INTENSITY: u8 = 100;

/// format of the time field in the add/edit form
pub const FORM_TIME_FORMAT: &str = "%H:%M";

/// The add/edit alarm form as the browser sends it.
///
/// Everything is kept as text so bad input turns into a [`ValidationError`]
/// the user can see, instead of a rejected request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlarmForm {
    #[serde(default)]
    pub name: String,
    /// time of day, `HH:MM`
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub intensity: String,
    /// seconds, may be fractional
    #[serde(default)]
    pub duration: String,
    /// checkboxes are only sent when ticked
    #[serde(default)]
    pub vibrate_before: Option<String>,
}

impl AlarmForm {
    /// prefill the form for editing an existing alarm
    #[must_use]
    pub fn from_record(name: &str, record: &AlarmRecord) -> Self {
        Self {
            name: name.to_string(),
            time: record.fire_at.format(FORM_TIME_FORMAT).to_string(),
            intensity: record.intensity.to_string(),
            duration: format_duration_secs(record.duration_ms),
            vibrate_before: record.vibrate_before.then(|| "on".to_string()),
        }
    }

    #[must_use]
    pub const fn vibrate_before(&self) -> bool {
        self.vibrate_before.is_some()
    }

    /// Validate the form and turn it into a named alarm.
    ///
    /// The alarm is set for the next time the chosen time of day comes around:
    /// today if it is not already past, otherwise tomorrow.
    pub fn build(&self, now: NaiveDateTime) -> Result<(String, AlarmRecord), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let time = parse_time(&self.time)?;
        let intensity = parse_intensity(&self.intensity)?;
        let duration_ms = parse_duration_ms(&self.duration)?;
        Ok((
            name.to_string(),
            AlarmRecord::new(
                next_occurrence_of(time, now),
                intensity,
                duration_ms,
                self.vibrate_before(),
            ),
        ))
    }
}

/// the first `time` (to the minute) that is not before `now`
#[must_use]
pub fn next_occurrence_of(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
    let today = now.date().and_time(time);
    if today < now {
        today + Duration::days(1)
    } else {
        today
    }
}

fn parse_time(input: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(input.trim(), FORM_TIME_FORMAT)
        .map_err(|_| ValidationError::Time(input.to_string()))
}

fn parse_intensity(input: &str) -> Result<u8, ValidationError> {
    input
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|intensity| *intensity <= MAX_INTENSITY)
        .ok_or_else(|| ValidationError::Intensity(input.to_string()))
}

/// milliseconds as seconds text, `2500` -> `"2.5"`, `2000` -> `"2"`
fn format_duration_secs(ms: u32) -> String {
    let text = format!("{}.{:03}", ms / 1000, ms % 1000);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

// decimal seconds to whole milliseconds, digits past the third decimal are dropped
fn parse_duration_ms(input: &str) -> Result<u32, ValidationError> {
    let invalid = || ValidationError::Duration(input.to_string());
    let (whole, frac) = input.trim().split_once('.').unwrap_or((input.trim(), ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let secs: u32 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let millis = frac
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .fold(0, |acc, digit| acc * 10 + u32::from(digit - b'0'));
    secs.checked_mul(1000)
        .and_then(|ms| ms.checked_add(millis))
        .ok_or_else(invalid)
}
