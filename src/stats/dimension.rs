use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::safe::{label_or_unknown, UNKNOWN_LABEL};
use crate::models::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucketing {
    #[default]
    Session,
    Hourly,
}

impl TimeBucketing {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "hourly" => TimeBucketing::Hourly,
            _ => TimeBucketing::Session,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationOptions {
    /// Offset applied to entry timestamps before time-of-day/day-of-week bucketing
    pub utc_offset_minutes: i32,
    pub time_bucketing: TimeBucketing,
    /// Number of most recent trades used for the consistency score
    pub consistency_window: usize,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            time_bucketing: TimeBucketing::Session,
            consistency_window: 20,
        }
    }
}

impl AggregationOptions {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub(crate) fn local_time(&self, timestamp: i64) -> Option<DateTime<FixedOffset>> {
        DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&self.offset()))
    }

    /// Calendar date of `timestamp` in the configured offset
    pub fn local_date(&self, timestamp: i64) -> Option<NaiveDate> {
        self.local_time(timestamp).map(|local| local.date_naive())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    SetupType,
    TimeOfDay,
    DayOfWeek,
    EmotionalState,
    PlanAdherence,
    RiskReward,
    Symbol,
}

pub const SESSION_SLOTS: [&str; 6] = [
    "Pre-Market",
    "Market Open",
    "Midday",
    "Afternoon",
    "After Hours",
    "Overnight",
];

pub const HOUR_SLOTS: [&str; 24] = [
    "00:00", "01:00", "02:00", "03:00", "04:00", "05:00", "06:00", "07:00", "08:00", "09:00",
    "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00", "17:00", "18:00", "19:00",
    "20:00", "21:00", "22:00", "23:00",
];

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const RISK_REWARD_RANGES: [&str; 4] = ["<1", "1-2", "2-3", ">3"];

fn session_slot(minute_of_day: u32) -> &'static str {
    match minute_of_day {
        240..=569 => "Pre-Market",   // 04:00-09:29
        570..=659 => "Market Open",  // 09:30-10:59
        660..=839 => "Midday",       // 11:00-13:59
        840..=959 => "Afternoon",    // 14:00-15:59
        960..=1199 => "After Hours", // 16:00-19:59
        _ => "Overnight",
    }
}

fn risk_reward_range(rr: f64) -> &'static str {
    if rr < 1.0 {
        "<1"
    } else if rr < 2.0 {
        "1-2"
    } else if rr < 3.0 {
        "2-3"
    } else {
        ">3"
    }
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::SetupType,
        Dimension::TimeOfDay,
        Dimension::DayOfWeek,
        Dimension::EmotionalState,
        Dimension::PlanAdherence,
        Dimension::RiskReward,
        Dimension::Symbol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::SetupType => "setup_type",
            Dimension::TimeOfDay => "time_of_day",
            Dimension::DayOfWeek => "day_of_week",
            Dimension::EmotionalState => "emotional_state",
            Dimension::PlanAdherence => "plan_adherence",
            Dimension::RiskReward => "risk_reward",
            Dimension::Symbol => "symbol",
        }
    }

    /// Buckets always reported for this dimension, in display order
    pub fn fixed_labels(&self, options: &AggregationOptions) -> Option<&'static [&'static str]> {
        match self {
            Dimension::TimeOfDay => match options.time_bucketing {
                TimeBucketing::Session => Some(&SESSION_SLOTS[..]),
                TimeBucketing::Hourly => Some(&HOUR_SLOTS[..]),
            },
            Dimension::DayOfWeek => Some(&WEEKDAYS[..]),
            Dimension::RiskReward => Some(&RISK_REWARD_RANGES[..]),
            _ => None,
        }
    }

    pub fn label_for(&self, trade: &Trade, options: &AggregationOptions) -> String {
        match self {
            Dimension::SetupType => label_or_unknown(trade.setup_type.as_deref()),
            Dimension::EmotionalState => label_or_unknown(trade.emotional_state.as_deref()),
            Dimension::PlanAdherence => label_or_unknown(trade.plan_adherence.as_deref()),
            Dimension::Symbol => label_or_unknown(Some(trade.symbol.as_str())),
            Dimension::TimeOfDay => match options.local_time(trade.entry_time) {
                Some(local) => match options.time_bucketing {
                    TimeBucketing::Session => {
                        session_slot(local.hour() * 60 + local.minute()).to_string()
                    }
                    TimeBucketing::Hourly => HOUR_SLOTS[local.hour() as usize].to_string(),
                },
                None => UNKNOWN_LABEL.to_string(),
            },
            Dimension::DayOfWeek => match options.local_time(trade.entry_time) {
                Some(local) => {
                    WEEKDAYS[local.weekday().num_days_from_monday() as usize].to_string()
                }
                None => UNKNOWN_LABEL.to_string(),
            },
            Dimension::RiskReward => match trade.actual_rr.filter(|rr| rr.is_finite()) {
                Some(rr) => risk_reward_range(rr).to_string(),
                None => UNKNOWN_LABEL.to_string(),
            },
        }
    }
}
