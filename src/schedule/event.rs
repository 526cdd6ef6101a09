use chrono::{DateTime, Days, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RunsheetError;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, schemars::JsonSchema)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(EventId);
string_id!(CategoryId);
string_id!(RunnerId);
string_id!(RunId);

impl RunId {
    /// A fresh id for a newly created chain record.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Longest event the scheduler accepts.
pub const MAX_EVENT_DAYS: u32 = 366;

/// Event metadata consumed by the scheduler.
#[derive(Debug, Clone)]
pub struct EventInfo {
    pub id: EventId,
    pub name: String,
    pub event_start: DateTime<Utc>,
    pub event_days: u32,
    /// Operating hours, local to `timezone`, in `0..=24`.
    pub start_hour: u32,
    pub end_hour: u32,
    pub timezone: Tz,
    pub first_run_id: Option<RunId>,
}

impl EventInfo {
    pub fn validate(&self) -> Result<(), RunsheetError> {
        if self.event_days == 0 {
            return Err(RunsheetError::InvalidInput(
                "Event must last at least one day".to_string(),
            ));
        }
        if self.event_days > MAX_EVENT_DAYS {
            return Err(RunsheetError::InvalidInput(format!(
                "Event cannot last more than {MAX_EVENT_DAYS} days (got {})",
                self.event_days
            )));
        }
        if self.start_hour > 24 || self.end_hour > 24 {
            return Err(RunsheetError::InvalidInput(format!(
                "Operating hours must be within 0-24 (got {}-{})",
                self.start_hour, self.end_hour
            )));
        }
        if self.start_hour >= self.end_hour {
            return Err(RunsheetError::InvalidInput(format!(
                "Start hour {} must be before end hour {}",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }

    /// First local calendar day of the event.
    pub fn first_day(&self) -> NaiveDate {
        self.event_start.with_timezone(&self.timezone).date_naive()
    }

    /// The instant the first scheduled item begins: the event's first local
    /// day at `start_hour:00`.
    pub fn schedule_start(&self) -> DateTime<Utc> {
        local_hour_to_utc(self.first_day(), self.start_hour, &self.timezone)
            .unwrap_or(self.event_start)
    }

    pub fn event_end(&self) -> DateTime<Utc> {
        self.schedule_start()
            .checked_add_signed(TimeDelta::days(i64::from(self.event_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Resolve `hour:00` local time on `date` to UTC. Hour 24 is the following
/// midnight. Ambiguous local times resolve to the earlier instant; a time
/// skipped by a DST gap has no instant.
pub fn local_hour_to_utc(date: NaiveDate, hour: u32, tz: &Tz) -> Option<DateTime<Utc>> {
    let (date, hour) = if hour >= 24 {
        (date.checked_add_days(Days::new(1))?, 0)
    } else {
        (date, hour)
    };
    let naive = date.and_hms_opt(hour, 0, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn parse_timezone(name: &str) -> Result<Tz, RunsheetError> {
    name.parse::<Tz>()
        .map_err(|_| RunsheetError::InvalidTimezone(name.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub enum RunStatus {
    Pending,
    Accepted,
    Bonus,
    Backup,
    Rejected,
}

impl RunStatus {
    pub fn is_schedulable(self) -> bool {
        matches!(self, RunStatus::Accepted | RunStatus::Bonus)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerRef {
    pub id: RunnerId,
    pub name: Option<String>,
}

impl RunnerRef {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<Name missing>")
    }
}

/// A category that has been accepted (or accepted as a bonus) and can be
/// placed on the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulableCategory {
    pub id: CategoryId,
    pub event_id: EventId,
    pub game_title: String,
    pub category_name: String,
    pub estimate: String,
    pub run_status: RunStatus,
    pub runner: RunnerRef,
}
