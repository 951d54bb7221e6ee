//! Working-day policy and engine configuration.

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// The hours of each day that may receive placements, in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingDayPolicy {
    #[serde(with = "hhmm")]
    pub day_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub day_end: NaiveTime,
}

impl Default for WorkingDayPolicy {
    /// 09:00 to 21:00.
    fn default() -> Self {
        Self {
            day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            day_end: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl WorkingDayPolicy {
    pub fn new(day_start: NaiveTime, day_end: NaiveTime) -> Result<Self> {
        let policy = Self { day_start, day_end };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.day_start < self.day_end {
            Ok(())
        } else {
            Err(EngineError::InvalidPolicy(format!(
                "day start {} must be before day end {}",
                self.day_start, self.day_end
            )))
        }
    }
}

/// Spacing rules shared by the free-window builder, allocator and overlap guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRules {
    /// Kept clear on both sides of every busy interval and placement.
    pub buffer: Duration,
    /// Free windows shorter than this are discarded.
    pub min_slot: Duration,
}

impl Default for SlotRules {
    fn default() -> Self {
        Self {
            buffer: Duration::minutes(DEFAULT_BUFFER_MINUTES),
            min_slot: Duration::minutes(DEFAULT_MIN_SLOT_MINUTES),
        }
    }
}

pub const DEFAULT_BUFFER_MINUTES: i64 = 30;
pub const DEFAULT_MIN_SLOT_MINUTES: i64 = 30;
/// Upper bound for both the buffer and the minimum slot length: one day.
pub const MAX_RULE_MINUTES: i64 = 24 * 60;

/// Process-wide engine configuration.
///
/// Every field has a default, so a partial JSON document (or `{}`) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub policy: WorkingDayPolicy,
    pub buffer_minutes: i64,
    pub min_slot_minutes: i64,
    /// IANA zone the working day and time hints are interpreted in.
    pub timezone: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: WorkingDayPolicy::default(),
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            min_slot_minutes: DEFAULT_MIN_SLOT_MINUTES,
            timezone: "UTC".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;
        if !(0..=MAX_RULE_MINUTES).contains(&self.buffer_minutes) {
            return Err(EngineError::InvalidPolicy(format!(
                "buffer must be between 0 and {} minutes, got {}",
                MAX_RULE_MINUTES, self.buffer_minutes
            )));
        }
        if !(1..=MAX_RULE_MINUTES).contains(&self.min_slot_minutes) {
            return Err(EngineError::InvalidPolicy(format!(
                "minimum slot length must be between 1 and {} minutes, got {}",
                MAX_RULE_MINUTES, self.min_slot_minutes
            )));
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(self.timezone.clone()))
    }

    /// Spacing rules, with out-of-range values clamped into the accepted range.
    pub fn rules(&self) -> SlotRules {
        SlotRules {
            buffer: Duration::minutes(self.buffer_minutes.clamp(0, MAX_RULE_MINUTES)),
            min_slot: Duration::minutes(self.min_slot_minutes.clamp(1, MAX_RULE_MINUTES)),
        }
    }
}

/// `"HH:MM"` (or `"HH:MM:SS"`) serde format for times of day.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }
}

pub use hhmm::parse as parse_time_of_day;
