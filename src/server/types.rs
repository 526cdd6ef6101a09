use schemars::JsonSchema;
use serde::Deserialize;

use crate::schedule::chain::ScheduledRunRecord;
use crate::schedule::event::RunStatus;

// -- Tool parameter structs --

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct LoadEventParams {
    #[schemars(description = "Event ID")]
    pub(crate) event_id: String,
    #[schemars(description = "Event name, used as the iCal calendar name")]
    pub(crate) name: String,
    #[schemars(description = "Event start (ISO 8601, e.g. '2025-01-10T00:00:00Z'). Its local date is the first event day.")]
    pub(crate) event_start: String,
    #[schemars(description = "Number of days the event runs, 1 to 366")]
    pub(crate) event_days: u32,
    #[schemars(description = "Local hour the schedule starts each day, 0-24")]
    pub(crate) start_hour: u32,
    #[schemars(description = "Local hour the event day ends, 0-24, after start_hour")]
    pub(crate) end_hour: u32,
    #[schemars(description = "IANA timezone name (e.g. 'America/New_York'). Defaults to the server's display timezone.")]
    pub(crate) timezone: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct CategoryInput {
    #[schemars(description = "Category ID")]
    pub(crate) id: String,
    #[schemars(description = "Game title")]
    pub(crate) game_title: String,
    #[schemars(description = "Category name (e.g. 'Any%')")]
    pub(crate) category_name: String,
    #[schemars(description = "Estimate as H:MM:SS")]
    pub(crate) estimate: String,
    #[schemars(description = "Submission status. Only Accepted and Bonus runs are schedulable.")]
    pub(crate) run_status: RunStatus,
    #[schemars(description = "Runner ID")]
    pub(crate) runner_id: String,
    #[schemars(description = "Runner display name")]
    pub(crate) runner_name: Option<String>,
    #[schemars(description = "Optional runner availability for this event: hour-aligned ISO 8601 instants, each meaning 'available for the hour starting here'. Replaces any previous availability for the runner.")]
    pub(crate) availability: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct LoadCategoriesParams {
    #[schemars(description = "Event ID the categories belong to")]
    pub(crate) event_id: String,
    #[schemars(description = "Categories to load")]
    pub(crate) categories: Vec<CategoryInput>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct SetAvailabilityParams {
    #[schemars(description = "Event ID")]
    pub(crate) event_id: String,
    #[schemars(description = "Runner ID")]
    pub(crate) runner_id: String,
    #[schemars(description = "Hour-aligned ISO 8601 instants, each meaning 'available for the hour starting here'")]
    pub(crate) slots: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct GetAvailabilityParams {
    #[schemars(description = "Event ID")]
    pub(crate) event_id: String,
    #[schemars(description = "Runner ID")]
    pub(crate) runner_id: String,
    #[schemars(description = "Return per-day segments with local start/end hours instead of absolute ranges. Defaults to false.")]
    pub(crate) by_day: Option<bool>,
    #[schemars(description = "IANA timezone for per-day segments. Defaults to the server's display timezone.")]
    pub(crate) timezone: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct LoadScheduleParams {
    #[schemars(description = "Event ID")]
    pub(crate) event_id: String,
    #[schemars(description = "ID of the first record in the chain, or null for an empty schedule")]
    pub(crate) first_run_id: Option<String>,
    #[schemars(description = "Persisted chain records for the event, in any order")]
    pub(crate) records: Vec<ScheduledRunRecord>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct EventParams {
    #[schemars(description = "Event ID")]
    pub(crate) event_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct SelectEntryParams {
    #[schemars(description = "Event ID")]
    pub(crate) event_id: String,
    #[schemars(description = "Entry key from get_schedule or get_timeline. Omit to clear the selection so the next insert goes to the front.")]
    pub(crate) entry_key: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct InsertRunParams {
    #[schemars(description = "Event ID")]
    pub(crate) event_id: String,
    #[schemars(description = "Category ID to schedule")]
    pub(crate) category_id: String,
    #[schemars(description = "Setup time before the run as H:MM:SS. Defaults to the server's default setup time.")]
    pub(crate) setup_time: Option<String>,
    #[schemars(description = "Insert before the selected entry instead of after it. Defaults to false.")]
    pub(crate) before: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct InsertInterstitialParams {
    #[schemars(description = "Event ID")]
    pub(crate) event_id: String,
    #[schemars(description = "Interstitial name (e.g. 'Break', 'Opening ceremony')")]
    pub(crate) name: String,
    #[schemars(description = "Length as H:MM:SS")]
    pub(crate) length: String,
    #[schemars(description = "Insert before the selected entry instead of after it. Defaults to false.")]
    pub(crate) before: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ListUnslottedRunsParams {
    #[schemars(description = "Event ID")]
    pub(crate) event_id: String,
    #[schemars(description = "Setup time to assume for each candidate, as H:MM:SS. Defaults to the server's default setup time.")]
    pub(crate) setup_time: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct CheckRunAvailabilityParams {
    #[schemars(description = "Event ID")]
    pub(crate) event_id: String,
    #[schemars(description = "Category ID")]
    pub(crate) category_id: String,
    #[schemars(description = "Instant the run would start (ISO 8601)")]
    pub(crate) start: String,
    #[schemars(description = "Setup time as H:MM:SS. Defaults to the server's default setup time.")]
    pub(crate) setup_time: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ConvertDurationParams {
    #[schemars(description = "Duration text to parse (H:MM:SS, MM:SS or SS)")]
    pub(crate) text: Option<String>,
    #[schemars(description = "Number of seconds to format as H:MM:SS")]
    pub(crate) seconds: Option<u64>,
}
