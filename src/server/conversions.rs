use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rmcp::{ErrorData as McpError, model::*};
use serde::Serialize;

use crate::error::RunsheetError;
use crate::schedule::availability::Availability;
use crate::schedule::chain::EntryKey;
use crate::schedule::event::{
    CategoryId, EventId, EventInfo, RunnerId, RunnerRef, SchedulableCategory, parse_timezone,
};
use super::types::{CategoryInput, LoadEventParams};

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RunsheetError> {
    // Try RFC 3339 first (with timezone offset)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Try without timezone (assume UTC)
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    Err(RunsheetError::InvalidTimestamp(format!(
        "Cannot parse datetime: '{}'. Use ISO 8601 format.",
        s
    )))
}

pub(crate) fn parse_slots(slots: &[String]) -> Result<Vec<DateTime<Utc>>, RunsheetError> {
    slots.iter().map(|s| parse_datetime(s)).collect()
}

pub(crate) fn parse_entry_key(s: &str) -> Result<EntryKey, RunsheetError> {
    uuid::Uuid::parse_str(s)
        .map(EntryKey)
        .map_err(|e| RunsheetError::InvalidInput(format!("Invalid entry key: {}", e)))
}

/// The zone named by `name`, or `fallback` when none is given.
pub(crate) fn timezone_or(name: Option<&str>, fallback: Tz) -> Result<Tz, RunsheetError> {
    name.map(parse_timezone).unwrap_or(Ok(fallback))
}

/// Build event metadata from tool input. The persisted chain head is kept
/// from `existing` so reloading an event does not orphan its schedule.
pub(crate) fn event_from_params(
    params: &LoadEventParams,
    default_timezone: Tz,
    existing: Option<&EventInfo>,
) -> Result<EventInfo, RunsheetError> {
    let event = EventInfo {
        id: EventId(params.event_id.clone()),
        name: params.name.clone(),
        event_start: parse_datetime(&params.event_start)?,
        event_days: params.event_days,
        start_hour: params.start_hour,
        end_hour: params.end_hour,
        timezone: timezone_or(params.timezone.as_deref(), default_timezone)?,
        first_run_id: existing.and_then(|e| e.first_run_id.clone()),
    };
    event.validate()?;
    Ok(event)
}

pub(crate) fn category_from_input(
    event_id: &EventId,
    input: &CategoryInput,
) -> Result<(SchedulableCategory, Option<Availability>), RunsheetError> {
    let runner_id = RunnerId(input.runner_id.clone());
    let availability = input
        .availability
        .as_deref()
        .map(|slots| Availability::new(runner_id.clone(), event_id.clone(), parse_slots(slots)?))
        .transpose()?;

    let category = SchedulableCategory {
        id: CategoryId(input.id.clone()),
        event_id: event_id.clone(),
        game_title: input.game_title.clone(),
        category_name: input.category_name.clone(),
        estimate: input.estimate.clone(),
        run_status: input.run_status,
        runner: RunnerRef {
            id: runner_id,
            name: input.runner_name.clone(),
        },
    };
    Ok((category, availability))
}

pub(crate) fn runsheet_err(e: RunsheetError) -> McpError {
    let code = match &e {
        RunsheetError::EventNotFound(_)
        | RunsheetError::CategoryNotFound(_)
        | RunsheetError::EntryNotFound(_)
        | RunsheetError::ScheduleNotOpen(_) => ErrorCode::RESOURCE_NOT_FOUND,
        _ => ErrorCode::INVALID_PARAMS,
    };
    McpError::new(code, e.to_string(), None::<serde_json::Value>)
}

pub(crate) fn json_text<T: Serialize>(value: &T) -> CallToolResult {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string());
    CallToolResult::success(vec![Content::text(json)])
}
