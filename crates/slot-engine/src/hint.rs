//! Resolve loosely structured preferred-time hints into target instants.
//!
//! Accepted forms, first match wins:
//!
//! 1. An explicit date or date-time (`2026-10-20 14:00`, `20 Oct 2026 evening`,
//!    RFC 3339) resolves with [`Confidence::Exact`].
//! 2. A relative day (`today`, `tomorrow`, a weekday name) with an optional
//!    part-of-day keyword resolves to the next occurrence of that day with
//!    [`Confidence::Approximate`].
//! 3. Anything else resolves to `None`, meaning "no preference".
//!
//! Every target is rounded forward to a `:00`/`:30` boundary in the local zone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::{at_local_time, local_date, local_to_utc, round_up_in};

/// How much of the target was stated explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// An explicit date (and possibly time) was parsed.
    Exact,
    /// Only a relative day and part of day were inferred.
    Approximate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHint {
    pub target: DateTime<Utc>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

const PART_OF_DAY: [(PartOfDay, &str, u32); 4] = [
    (PartOfDay::Morning, "morning", 9),
    (PartOfDay::Afternoon, "afternoon", 14),
    (PartOfDay::Evening, "evening", 18),
    (PartOfDay::Night, "night", 21),
];

impl PartOfDay {
    pub fn from_keyword(word: &str) -> Option<Self> {
        PART_OF_DAY
            .iter()
            .find(|(_, keyword, _)| *keyword == word)
            .map(|(part, _, _)| *part)
    }

    pub fn hour(self) -> u32 {
        PART_OF_DAY
            .iter()
            .find(|(part, _, _)| *part == self)
            .map_or(9, |(_, _, hour)| *hour)
    }

    fn time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), 0, 0).unwrap_or(NaiveTime::MIN)
    }
}

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Resolve `raw` relative to `now` in zone `tz`.
///
/// A target that lands after `deadline` is discarded, since no placement may
/// end after the deadline anyway.
pub fn resolve_hint(
    raw: Option<&str>,
    now: DateTime<Utc>,
    deadline: DateTime<Utc>,
    tz: &Tz,
) -> Option<ResolvedHint> {
    let text = raw?.trim().to_lowercase().replace(',', " ");
    if text.is_empty() {
        return None;
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let part = words.iter().find_map(|w| PartOfDay::from_keyword(w));
    let remainder: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| PartOfDay::from_keyword(w).is_none())
        .collect();
    let remainder = remainder.join(" ");

    let resolved = explicit(&remainder, part, tz)
        .map(|target| ResolvedHint {
            target,
            confidence: Confidence::Exact,
        })
        .or_else(|| {
            relative(&remainder, part, now, tz).map(|target| ResolvedHint {
                target,
                confidence: Confidence::Approximate,
            })
        });

    let Some(mut hint) = resolved else {
        tracing::debug!(hint = %text, "time hint not understood, no preference");
        return None;
    };
    hint.target = round_up_in(hint.target, tz);

    if hint.target > deadline {
        tracing::debug!(hint = %text, target = %hint.target, %deadline, "time hint falls after deadline, ignored");
        return None;
    }
    Some(hint)
}

fn explicit(text: &str, part: Option<PartOfDay>, tz: &Tz) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    // The text was lower-cased; RFC 3339 and the `T` separator want upper case.
    let upper = text.to_uppercase();
    if let Ok(dt) = DateTime::parse_from_rfc3339(&upper) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&upper, fmt) {
            return local_to_utc(tz, naive);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            let time = part.unwrap_or(PartOfDay::Morning).time();
            return at_local_time(tz, date, time);
        }
    }
    None
}

enum RelativeDay {
    Today,
    Tomorrow,
    Weekday(Weekday),
}

fn relative_day(word: &str) -> Option<RelativeDay> {
    match word {
        "today" | "tonight" => Some(RelativeDay::Today),
        "tomorrow" => Some(RelativeDay::Tomorrow),
        other => other.parse::<Weekday>().ok().map(RelativeDay::Weekday),
    }
}

fn relative(
    text: &str,
    part: Option<PartOfDay>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Option<DateTime<Utc>> {
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| !matches!(*w, "next" | "on"))
        .collect();
    let day = match words.as_slice() {
        // "this afternoon": the part of day was already split off.
        ["this"] if part.is_some() => RelativeDay::Today,
        ["this", word] | [word] => relative_day(word)?,
        _ => return None,
    };
    // "tonight" carries its own part of day.
    let part = part.or_else(|| text.contains("tonight").then_some(PartOfDay::Night));
    let time = part.unwrap_or(PartOfDay::Morning).time();

    let today = local_date(now, tz);
    match day {
        RelativeDay::Today => at_local_time(tz, today, time),
        RelativeDay::Tomorrow => at_local_time(tz, today.succ_opt()?, time),
        RelativeDay::Weekday(weekday) => {
            let ahead = (7 + weekday.num_days_from_monday()
                - today.weekday().num_days_from_monday())
                % 7;
            let date = today + Duration::days(i64::from(ahead));
            let candidate = at_local_time(tz, date, time)?;
            if candidate < now {
                at_local_time(tz, date + Duration::days(7), time)
            } else {
                Some(candidate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn part_of_day_table() {
        assert_eq!(PartOfDay::Morning.hour(), 9);
        assert_eq!(PartOfDay::Afternoon.hour(), 14);
        assert_eq!(PartOfDay::Evening.hour(), 18);
        assert_eq!(PartOfDay::Night.hour(), 21);
        assert_eq!(PartOfDay::from_keyword("evening"), Some(PartOfDay::Evening));
        assert_eq!(PartOfDay::from_keyword("noon"), None);
    }

    #[test]
    fn this_with_part_of_day_means_today() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let evening = relative("this", Some(PartOfDay::Evening), now, &Tz::UTC);
        assert_eq!(evening, Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).single());
        assert_eq!(relative("this", None, now, &Tz::UTC), None);
    }

    #[test]
    fn weekday_names_and_abbreviations_parse() {
        assert!(matches!(
            relative_day("tuesday"),
            Some(RelativeDay::Weekday(Weekday::Tue))
        ));
        assert!(matches!(
            relative_day("fri"),
            Some(RelativeDay::Weekday(Weekday::Fri))
        ));
        assert!(relative_day("someday").is_none());
    }
}
