use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Weekday};
use doctero_core::{AppError, AppResult};

use crate::backup::BackupTier;

/// Highest day of month accepted by monthly rules. Every month has it.
pub const MAX_MONTHLY_DAY: u32 = 28;

const MAX_LOOKAHEAD_DAYS: u64 = 62;

/// Wall-clock rule that decides when a tier fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleRule {
    /// Every day at `time`.
    DailyAt {
        /// Local wall-clock time.
        time: NaiveTime,
    },
    /// Every week on `weekday` at `time`.
    WeeklyAt {
        /// Day of week.
        weekday: Weekday,
        /// Local wall-clock time.
        time: NaiveTime,
    },
    /// Every month on `day` at `time`.
    MonthlyAt {
        /// Day of month, `1..=MAX_MONTHLY_DAY`.
        day: u32,
        /// Local wall-clock time.
        time: NaiveTime,
    },
}

impl ScheduleRule {
    /// Returns the wall-clock time of day the rule fires at.
    #[must_use]
    pub fn time(&self) -> NaiveTime {
        match self {
            Self::DailyAt { time }
            | Self::WeeklyAt { time, .. }
            | Self::MonthlyAt { time, .. } => *time,
        }
    }

    /// Returns the first fire instant strictly after `after`, evaluated in
    /// `after`'s time zone.
    ///
    /// Returns `None` only when no matching local time exists within the
    /// lookahead window, which cannot happen for fixed-offset zones.
    #[must_use]
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let timezone = after.timezone();
        let start = after.date_naive();

        for offset in 0..=MAX_LOOKAHEAD_DAYS {
            let date = start.checked_add_days(Days::new(offset))?;
            if !self.matches_date(date) {
                continue;
            }

            let Some(candidate) = timezone
                .from_local_datetime(&date.and_time(self.time()))
                .earliest()
            else {
                continue;
            };

            if candidate > *after {
                return Some(candidate);
            }
        }

        None
    }

    fn matches_date(&self, date: NaiveDate) -> bool {
        match self {
            Self::DailyAt { .. } => true,
            Self::WeeklyAt { weekday, .. } => date.weekday() == *weekday,
            Self::MonthlyAt { day, .. } => date.day() == *day,
        }
    }
}

impl FromStr for ScheduleRule {
    type Err = AppError;

    /// Parses `"HH:MM"`, `"<weekday> HH:MM"` or `"<day> HH:MM"`.
    fn from_str(value: &str) -> AppResult<Self> {
        let parts: Vec<&str> = value.split_whitespace().collect();
        match parts.as_slice() {
            [time] => Ok(Self::DailyAt {
                time: parse_time(time)?,
            }),
            [qualifier, time] => {
                let time = parse_time(time)?;
                if let Ok(day) = qualifier.parse::<u32>() {
                    if !(1..=MAX_MONTHLY_DAY).contains(&day) {
                        return Err(AppError::Validation(format!(
                            "monthly schedule day must be between 1 and {MAX_MONTHLY_DAY}, got {day}"
                        )));
                    }
                    return Ok(Self::MonthlyAt { day, time });
                }

                let weekday = qualifier.parse::<Weekday>().map_err(|_| {
                    AppError::Validation(format!(
                        "invalid schedule qualifier '{qualifier}', expected a weekday or day of month"
                    ))
                })?;
                Ok(Self::WeeklyAt { weekday, time })
            }
            _ => Err(AppError::Validation(format!(
                "invalid schedule '{value}', expected 'HH:MM', '<weekday> HH:MM' or '<day> HH:MM'"
            ))),
        }
    }
}

impl Display for ScheduleRule {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DailyAt { time } => write!(formatter, "daily at {}", time.format("%H:%M")),
            Self::WeeklyAt { weekday, time } => {
                write!(formatter, "every {weekday} at {}", time.format("%H:%M"))
            }
            Self::MonthlyAt { day, time } => {
                write!(formatter, "monthly on day {day} at {}", time.format("%H:%M"))
            }
        }
    }
}

fn parse_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|error| {
        AppError::Validation(format!("invalid schedule time '{value}': {error}"))
    })
}

/// Recurring trigger for one scheduled tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTrigger {
    tier: BackupTier,
    rule: ScheduleRule,
}

impl ScheduleTrigger {
    /// Creates a trigger. The manual tier cannot be scheduled.
    pub fn new(tier: BackupTier, rule: ScheduleRule) -> AppResult<Self> {
        if !tier.is_scheduled() {
            return Err(AppError::Validation(format!(
                "tier '{tier}' cannot be scheduled"
            )));
        }

        Ok(Self { tier, rule })
    }

    /// Default triggers: daily 02:00, weekly Sunday 03:00, monthly day 1 04:00.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                tier: BackupTier::Daily,
                rule: ScheduleRule::DailyAt {
                    time: wall_clock(2),
                },
            },
            Self {
                tier: BackupTier::Weekly,
                rule: ScheduleRule::WeeklyAt {
                    weekday: Weekday::Sun,
                    time: wall_clock(3),
                },
            },
            Self {
                tier: BackupTier::Monthly,
                rule: ScheduleRule::MonthlyAt {
                    day: 1,
                    time: wall_clock(4),
                },
            },
        ]
    }

    /// Returns the triggered tier.
    #[must_use]
    pub fn tier(&self) -> BackupTier {
        self.tier
    }

    /// Returns the wall-clock rule.
    #[must_use]
    pub fn rule(&self) -> ScheduleRule {
        self.rule
    }
}

fn wall_clock(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeDelta, Timelike, Utc};
    use proptest::prelude::*;

    use super::*;

    fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .unwrap_or_else(|| unreachable!())
    }

    fn rule(value: &str) -> ScheduleRule {
        value
            .parse::<ScheduleRule>()
            .unwrap_or_else(|_| panic!("test rule '{value}' must parse"))
    }

    #[test]
    fn parses_all_rule_forms() {
        assert_eq!(
            rule("02:00"),
            ScheduleRule::DailyAt {
                time: wall_clock(2)
            }
        );
        assert_eq!(
            rule("Sunday 03:00"),
            ScheduleRule::WeeklyAt {
                weekday: Weekday::Sun,
                time: wall_clock(3)
            }
        );
        assert_eq!(
            rule("1 04:00"),
            ScheduleRule::MonthlyAt {
                day: 1,
                time: wall_clock(4)
            }
        );
    }

    #[test]
    fn rejects_invalid_rules() {
        assert!("25:00".parse::<ScheduleRule>().is_err());
        assert!("29 04:00".parse::<ScheduleRule>().is_err());
        assert!("someday 04:00".parse::<ScheduleRule>().is_err());
        assert!("".parse::<ScheduleRule>().is_err());
        assert!("sun 03:00 extra".parse::<ScheduleRule>().is_err());
    }

    #[test]
    fn daily_fires_later_same_day_or_next_day() {
        let daily = rule("02:00");
        assert_eq!(
            daily.next_after(&utc(2026, 10, 17, 1, 59)),
            Some(utc(2026, 10, 17, 2, 0))
        );
        assert_eq!(
            daily.next_after(&utc(2026, 10, 17, 2, 0)),
            Some(utc(2026, 10, 18, 2, 0))
        );
    }

    #[test]
    fn weekly_fires_on_next_sunday() {
        // 2026-10-17 is a Saturday.
        let weekly = rule("sun 03:00");
        assert_eq!(
            weekly.next_after(&utc(2026, 10, 17, 12, 0)),
            Some(utc(2026, 10, 18, 3, 0))
        );
    }

    #[test]
    fn monthly_rolls_over_year_end() {
        let monthly = rule("1 04:00");
        assert_eq!(
            monthly.next_after(&utc(2026, 12, 1, 4, 0)),
            Some(utc(2027, 1, 1, 4, 0))
        );
    }

    #[test]
    fn wall_clock_is_evaluated_in_the_given_offset() {
        let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap_or_else(|| unreachable!());
        let after = utc(2026, 10, 17, 0, 0).with_timezone(&offset);
        let next = rule("02:00").next_after(&after);
        assert_eq!(
            next.map(|instant| instant.with_timezone(&Utc)),
            Some(utc(2026, 10, 17, 20, 30))
        );
    }

    #[test]
    fn manual_tier_cannot_be_scheduled() {
        assert!(ScheduleTrigger::new(BackupTier::Manual, rule("02:00")).is_err());
        assert!(ScheduleTrigger::new(BackupTier::Daily, rule("02:00")).is_ok());
    }

    fn any_rule() -> impl Strategy<Value = ScheduleRule> {
        let time = (0_u32..24, 0_u32..60).prop_map(|(hour, minute)| {
            NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
        });
        prop_oneof![
            time.clone().prop_map(|time| ScheduleRule::DailyAt { time }),
            (0_u8..7, time.clone()).prop_map(|(weekday, time)| ScheduleRule::WeeklyAt {
                weekday: Weekday::try_from(weekday).unwrap_or(Weekday::Mon),
                time,
            }),
            (1_u32..=MAX_MONTHLY_DAY, time)
                .prop_map(|(day, time)| ScheduleRule::MonthlyAt { day, time }),
        ]
    }

    proptest! {
        #[test]
        fn next_fire_is_the_first_matching_instant(
            rule in any_rule(),
            seconds in 946_684_800_i64..4_102_444_800_i64,
        ) {
            let after =
                DateTime::<Utc>::from_timestamp(seconds, 0).unwrap_or_else(|| unreachable!());
            let next = rule.next_after(&after);
            prop_assert!(next.is_some());
            let next = next.unwrap_or_else(|| unreachable!());

            prop_assert!(next > after);
            prop_assert_eq!(next.time(), rule.time());
            prop_assert_eq!(next.second(), 0);

            let max_gap = match rule {
                ScheduleRule::DailyAt { .. } => TimeDelta::days(1),
                ScheduleRule::WeeklyAt { weekday, .. } => {
                    prop_assert_eq!(next.weekday(), weekday);
                    TimeDelta::weeks(1)
                }
                ScheduleRule::MonthlyAt { day, .. } => {
                    prop_assert_eq!(next.day(), day);
                    TimeDelta::days(31)
                }
            };
            prop_assert!(next - after <= max_gap);
        }
    }
}
