mod conversions;
mod types;

pub(crate) use conversions::*;
pub(crate) use types::*;

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_router,
};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::RunsheetError;
use crate::ical_bridge;
use crate::schedule::ScheduleStore;
use crate::schedule::availability::Availability;
use crate::schedule::chain::ScheduledItem;
use crate::schedule::duration::{format_duration, is_duration_valid, parse_duration};
use crate::schedule::event::{CategoryId, EventId, RunId, RunnerId};

#[derive(Clone)]
pub struct RunsheetServer {
    store: Arc<RwLock<ScheduleStore>>,
    config: Arc<Config>,
}

impl ServerHandler for RunsheetServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "runsheet".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Runsheet builds the run schedule for a speedrunning marathon. \
                 Recommended workflow: \
                 1) Load the event with load_event, then its accepted runs with load_categories (include runner availability if you have it), \
                 2) Load any existing schedule with load_schedule and call open_schedule to start editing, \
                 3) Use list_unslotted_runs to see which runs still need a slot and whether their runner is free at the insertion point, \
                 4) Insert runs and interstitials with insert_run/insert_interstitial, moving the insertion point with select_entry, \
                 5) Review with get_timeline (runs flagged available=false fall outside their runner's availability), then save_schedule. \
                 Saving replaces the whole stored schedule for the event."
                    .into(),
            ),
        }
    }
}

// -- Tool implementations --

#[tool_router]
impl RunsheetServer {
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(RwLock::new(ScheduleStore::new(config.timezone))),
            config: Arc::new(config),
        }
    }

    fn setup_time_or_default(&self, setup_time: Option<String>) -> String {
        setup_time.unwrap_or_else(|| self.config.default_setup_time.clone())
    }

    // === Hydration ===

    #[tool(description = "Load or replace event metadata: name, start, number of days, daily operating hours and timezone. Reloading an event keeps its stored schedule.")]
    async fn load_event(
        &self,
        params: Parameters<LoadEventParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut store = self.store.write().await;
        let event_id = EventId(params.0.event_id.clone());
        let existing = store.event(&event_id).ok();
        let event = event_from_params(&params.0, store.default_timezone(), existing)
            .map_err(runsheet_err)?;

        let response = serde_json::json!({
            "event_id": event.id,
            "timezone": event.timezone.name(),
            "schedule_start": event.schedule_start().to_rfc3339(),
            "event_end": event.event_end().to_rfc3339(),
        });
        store.upsert_event(event).map_err(runsheet_err)?;

        Ok(json_text(&response))
    }

    #[tool(description = "Load schedulable categories (runs) for an event. Only Accepted and Bonus runs are kept. Each category may carry its runner's availability for the event.")]
    async fn load_categories(
        &self,
        params: Parameters<LoadCategoriesParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());

        let mut categories = Vec::new();
        let mut availability = Vec::new();
        for input in &params.0.categories {
            let (category, runner_availability) =
                category_from_input(&event_id, input).map_err(runsheet_err)?;
            categories.push(category);
            availability.extend(runner_availability);
        }

        let mut store = self.store.write().await;
        let received = categories.len();
        let kept = store
            .upsert_categories(&event_id, categories)
            .map_err(runsheet_err)?;
        let runners = availability.len();
        for record in availability {
            store.set_availability(record).map_err(runsheet_err)?;
        }

        Ok(json_text(&serde_json::json!({
            "event_id": event_id,
            "categories_loaded": kept,
            "categories_skipped": received - kept,
            "availability_records": runners,
        })))
    }

    #[tool(description = "Replace a runner's availability for an event. Each slot is an hour-aligned instant meaning 'available for the hour starting here'.")]
    async fn set_availability(
        &self,
        params: Parameters<SetAvailabilityParams>,
    ) -> Result<CallToolResult, McpError> {
        let slots = parse_slots(&params.0.slots).map_err(runsheet_err)?;
        let availability = Availability::new(
            RunnerId(params.0.runner_id.clone()),
            EventId(params.0.event_id.clone()),
            slots,
        )
        .map_err(runsheet_err)?;
        let segments = availability.segments();
        let hours: i64 = segments.iter().map(|s| s.duration().num_hours()).sum();

        let mut store = self.store.write().await;
        store.set_availability(availability).map_err(runsheet_err)?;

        Ok(json_text(&serde_json::json!({
            "runner_id": params.0.runner_id,
            "hours_available": hours,
            "segments": segments,
        })))
    }

    #[tool(description = "Get a runner's availability as contiguous segments, either as absolute ranges or per local day (with start/end hours, 24 meaning midnight).")]
    async fn get_availability(
        &self,
        params: Parameters<GetAvailabilityParams>,
    ) -> Result<CallToolResult, McpError> {
        let store = self.store.read().await;
        let event_id = EventId(params.0.event_id.clone());
        store.event(&event_id).map_err(runsheet_err)?;
        let tz = timezone_or(params.0.timezone.as_deref(), store.default_timezone())
            .map_err(runsheet_err)?;

        let runner_id = RunnerId(params.0.runner_id.clone());
        let Some(availability) = store.availability(&runner_id, &event_id) else {
            return Ok(json_text(&serde_json::json!({
                "runner_id": runner_id,
                "segments": [],
            })));
        };

        if params.0.by_day.unwrap_or(false) {
            Ok(json_text(&serde_json::json!({
                "runner_id": runner_id,
                "timezone": tz.name(),
                "segments": availability.day_segments(&tz),
            })))
        } else {
            Ok(json_text(&serde_json::json!({
                "runner_id": runner_id,
                "segments": availability.segments(),
            })))
        }
    }

    #[tool(description = "Replace the stored schedule chain for an event with records from an external store (firstRunId plus records linked by nextRunId). Call open_schedule afterwards to edit it.")]
    async fn load_schedule(
        &self,
        params: Parameters<LoadScheduleParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let count = params.0.records.len();

        let mut store = self.store.write().await;
        store
            .load_chain(
                &event_id,
                params.0.first_run_id.clone().map(RunId),
                params.0.records,
            )
            .map_err(runsheet_err)?;

        Ok(json_text(&serde_json::json!({
            "event_id": event_id,
            "records_loaded": count,
        })))
    }

    // === Editing ===

    #[tool(description = "Open the stored schedule for editing. Discards any unsaved edits for the event. The last entry is selected as the insertion point.")]
    async fn open_schedule(
        &self,
        params: Parameters<EventParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let mut store = self.store.write().await;
        let draft = store.open_schedule(&event_id).map_err(runsheet_err)?;
        Ok(json_text(draft))
    }

    #[tool(description = "Get the schedule being edited: ordered entries and the selected insertion point.")]
    async fn get_schedule(
        &self,
        params: Parameters<EventParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let store = self.store.read().await;
        let draft = store.draft(&event_id).map_err(runsheet_err)?;
        Ok(json_text(draft))
    }

    #[tool(description = "Move the insertion point to an entry, or clear it so the next insert goes to the front of the schedule.")]
    async fn select_entry(
        &self,
        params: Parameters<SelectEntryParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let key = params
            .0
            .entry_key
            .as_deref()
            .map(parse_entry_key)
            .transpose()
            .map_err(runsheet_err)?;

        let mut store = self.store.write().await;
        let draft = store.draft_mut(&event_id).map_err(runsheet_err)?;
        match key {
            Some(key) => draft.select(key).map_err(runsheet_err)?,
            None => draft.clear_selection(),
        }

        Ok(json_text(&serde_json::json!({ "selected": key })))
    }

    #[tool(description = "Insert a run after the insertion point (or before it with before=true). The new entry becomes the insertion point.")]
    async fn insert_run(
        &self,
        params: Parameters<InsertRunParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let item = ScheduledItem::Run {
            category_id: CategoryId(params.0.category_id.clone()),
            setup_time: self.setup_time_or_default(params.0.setup_time.clone()),
        };

        let mut store = self.store.write().await;
        let key = store
            .insert_item(&event_id, item, params.0.before.unwrap_or(false))
            .map_err(runsheet_err)?;

        Ok(json_text(&serde_json::json!({ "entry_key": key })))
    }

    #[tool(description = "Insert an interstitial (break, ceremony, etc.) after the insertion point (or before it with before=true). The new entry becomes the insertion point.")]
    async fn insert_interstitial(
        &self,
        params: Parameters<InsertInterstitialParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let item = ScheduledItem::Interstitial {
            name: params.0.name.clone(),
            length: params.0.length.clone(),
        };

        let mut store = self.store.write().await;
        let key = store
            .insert_item(&event_id, item, params.0.before.unwrap_or(false))
            .map_err(runsheet_err)?;

        Ok(json_text(&serde_json::json!({ "entry_key": key })))
    }

    #[tool(description = "Remove the entry at the insertion point. The insertion point moves to the entry that took its place, else the new last entry.")]
    async fn remove_selected(
        &self,
        params: Parameters<EventParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let mut store = self.store.write().await;
        let draft = store.draft_mut(&event_id).map_err(runsheet_err)?;
        let removed = draft.remove_selected();

        Ok(json_text(&serde_json::json!({
            "removed": removed,
            "selected": draft.selected().map(|e| e.key),
        })))
    }

    // === Querying ===

    #[tool(description = "Project the schedule onto the event calendar: start/end of every entry, whether each run's runner is available for it, per-day buckets, and whether the schedule overruns the event.")]
    async fn get_timeline(
        &self,
        params: Parameters<EventParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let store = self.store.read().await;
        let view = store.timeline(&event_id).map_err(runsheet_err)?;
        Ok(json_text(&view))
    }

    #[tool(description = "List runs of the event that are not on the schedule yet, each with whether its runner is available if inserted at the current insertion point.")]
    async fn list_unslotted_runs(
        &self,
        params: Parameters<ListUnslottedRunsParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let setup_time = self.setup_time_or_default(params.0.setup_time.clone());

        let store = self.store.read().await;
        let runs = store
            .unslotted_runs(&event_id, &setup_time)
            .map_err(runsheet_err)?;

        Ok(json_text(&serde_json::json!({
            "setup_time": setup_time,
            "setup_time_valid": is_duration_valid(&setup_time),
            "runs": runs,
        })))
    }

    #[tool(description = "Check whether a run fits strictly inside one of its runner's availability segments if it started at the given instant.")]
    async fn check_run_availability(
        &self,
        params: Parameters<CheckRunAvailabilityParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let category_id = CategoryId(params.0.category_id.clone());
        let start = parse_datetime(&params.0.start).map_err(runsheet_err)?;
        let setup_time = self.setup_time_or_default(params.0.setup_time.clone());
        if !is_duration_valid(&setup_time) {
            return Err(runsheet_err(RunsheetError::InvalidDuration(setup_time)));
        }

        let store = self.store.read().await;
        let available = store
            .check_run_availability(&event_id, &category_id, start, &setup_time)
            .map_err(runsheet_err)?;

        Ok(json_text(&serde_json::json!({
            "category_id": category_id,
            "start": start.to_rfc3339(),
            "available": available,
        })))
    }

    // === Saving and export ===

    #[tool(description = "Save the schedule being edited, replacing the stored chain for the event. Returns the new chain (firstRunId and records) to write to the external store. Nothing changes if validation fails.")]
    async fn save_schedule(
        &self,
        params: Parameters<EventParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let mut store = self.store.write().await;
        let write = store.save_schedule(&event_id).map_err(runsheet_err)?;
        Ok(json_text(&write))
    }

    #[tool(description = "Export the stored chain for an event (firstRunId plus records in schedule order).")]
    async fn export_chain(
        &self,
        params: Parameters<EventParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let store = self.store.read().await;
        let chain = store.persisted_chain(&event_id).map_err(runsheet_err)?;
        Ok(json_text(&chain))
    }

    #[tool(description = "Export the schedule being edited as an iCal/ICS string, one event per entry.")]
    async fn export_ical(
        &self,
        params: Parameters<EventParams>,
    ) -> Result<CallToolResult, McpError> {
        let event_id = EventId(params.0.event_id.clone());
        let store = self.store.read().await;
        let event = store.event(&event_id).map_err(runsheet_err)?;
        let view = store.timeline(&event_id).map_err(runsheet_err)?;

        let ical_str = ical_bridge::timeline_to_ical(&event.name, &view.slots);
        Ok(CallToolResult::success(vec![Content::text(ical_str)]))
    }

    #[tool(description = "Convert between H:MM:SS text and seconds. Reports whether the text is a valid schedule duration.")]
    async fn convert_duration(
        &self,
        params: Parameters<ConvertDurationParams>,
    ) -> Result<CallToolResult, McpError> {
        let ConvertDurationParams { text, seconds } = params.0;
        if text.is_none() && seconds.is_none() {
            return Err(runsheet_err(RunsheetError::InvalidInput(
                "Provide text or seconds".to_string(),
            )));
        }

        let parsed = text.as_deref().map(|t| {
            serde_json::json!({
                "text": t,
                "seconds": parse_duration(t),
                "valid": is_duration_valid(t),
            })
        });
        let formatted = seconds.map(|s| {
            serde_json::json!({
                "seconds": s,
                "text": format_duration(s),
            })
        });

        Ok(json_text(&serde_json::json!({
            "parsed": parsed,
            "formatted": formatted,
        })))
    }
}

impl RunsheetServer {
    pub fn into_router(self) -> rmcp::handler::server::router::Router<Self> {
        let mut router = rmcp::handler::server::router::Router::new(self);
        router.tool_router = Self::tool_router();
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::event::RunStatus;

    fn text_of(result: &CallToolResult) -> serde_json::Value {
        let wire = serde_json::to_value(result).unwrap();
        serde_json::from_str(wire["content"][0]["text"].as_str().unwrap()).unwrap()
    }

    fn server() -> RunsheetServer {
        RunsheetServer::new(Config {
            timezone: chrono_tz::UTC,
            default_setup_time: "0:10:00".to_string(),
        })
    }

    async fn seeded() -> RunsheetServer {
        let server = server();
        server
            .load_event(Parameters(LoadEventParams {
                event_id: "evt".to_string(),
                name: "Winter Marathon".to_string(),
                event_start: "2025-01-10T00:00:00Z".to_string(),
                event_days: 2,
                start_hour: 9,
                end_hour: 24,
                timezone: None,
            }))
            .await
            .unwrap();
        server
            .load_categories(Parameters(LoadCategoriesParams {
                event_id: "evt".to_string(),
                categories: vec![
                    CategoryInput {
                        id: "a".to_string(),
                        game_title: "Celeste".to_string(),
                        category_name: "Any%".to_string(),
                        estimate: "1:30:00".to_string(),
                        run_status: RunStatus::Accepted,
                        runner_id: "alice".to_string(),
                        runner_name: Some("Alice".to_string()),
                        availability: Some(
                            (8..12).map(|h| format!("2025-01-10T{h:02}:00:00Z")).collect(),
                        ),
                    },
                    CategoryInput {
                        id: "b".to_string(),
                        game_title: "Hollow Knight".to_string(),
                        category_name: "Any%".to_string(),
                        estimate: "0:45:00".to_string(),
                        run_status: RunStatus::Pending,
                        runner_id: "bob".to_string(),
                        runner_name: None,
                        availability: None,
                    },
                ],
            }))
            .await
            .unwrap();
        server
    }

    fn event_params() -> Parameters<EventParams> {
        Parameters(EventParams {
            event_id: "evt".to_string(),
        })
    }

    #[tokio::test]
    async fn load_categories_skips_unschedulable() {
        let server = server();
        server
            .load_event(Parameters(LoadEventParams {
                event_id: "evt".to_string(),
                name: "Marathon".to_string(),
                event_start: "2025-01-10T00:00:00Z".to_string(),
                event_days: 1,
                start_hour: 9,
                end_hour: 24,
                timezone: Some("UTC".to_string()),
            }))
            .await
            .unwrap();
        let result = server
            .load_categories(Parameters(LoadCategoriesParams {
                event_id: "evt".to_string(),
                categories: vec![],
            }))
            .await
            .unwrap();
        assert_eq!(text_of(&result)["categories_loaded"], 0);

        let seeded = seeded().await;
        let store = seeded.store.read().await;
        assert_eq!(store.event_categories(&EventId::from("evt")).len(), 1);
    }

    #[tokio::test]
    async fn edit_and_save_workflow() {
        let server = seeded().await;
        server.open_schedule(event_params()).await.unwrap();
        server
            .insert_interstitial(Parameters(InsertInterstitialParams {
                event_id: "evt".to_string(),
                name: "Opening".to_string(),
                length: "0:30:00".to_string(),
                before: None,
            }))
            .await
            .unwrap();
        server
            .insert_run(Parameters(InsertRunParams {
                event_id: "evt".to_string(),
                category_id: "a".to_string(),
                setup_time: None,
                before: None,
            }))
            .await
            .unwrap();

        let timeline = text_of(&server.get_timeline(event_params()).await.unwrap());
        let slots = timeline["slots"].as_array().unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1]["label"], "Celeste - Any% (Alice)");
        // 09:30 to 11:10 inside alice's 08:00-12:00
        assert_eq!(slots[1]["available"], true);

        let write = text_of(&server.save_schedule(event_params()).await.unwrap());
        assert_eq!(write["records"].as_array().unwrap().len(), 2);
        assert_eq!(write["records"][0]["isInterstitial"], true);

        let exported = text_of(&server.export_chain(event_params()).await.unwrap());
        assert_eq!(exported, write);
    }

    #[tokio::test]
    async fn load_event_rejects_oversized_event() {
        let server = server();
        let err = server
            .load_event(Parameters(LoadEventParams {
                event_id: "evt".to_string(),
                name: "Forever Marathon".to_string(),
                event_start: "2025-01-10T00:00:00Z".to_string(),
                event_days: u32::MAX,
                start_hour: 9,
                end_hour: 24,
                timezone: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let err = server.get_timeline(event_params()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn insert_requires_open_schedule() {
        let server = seeded().await;
        let err = server
            .insert_run(Parameters(InsertRunParams {
                event_id: "evt".to_string(),
                category_id: "a".to_string(),
                setup_time: None,
                before: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn select_entry_rejects_unknown_key() {
        let server = seeded().await;
        server.open_schedule(event_params()).await.unwrap();
        let err = server
            .select_entry(Parameters(SelectEntryParams {
                event_id: "evt".to_string(),
                entry_key: Some("not-a-key".to_string()),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn get_availability_by_day() {
        let server = seeded().await;
        let result = server
            .get_availability(Parameters(GetAvailabilityParams {
                event_id: "evt".to_string(),
                runner_id: "alice".to_string(),
                by_day: Some(true),
                timezone: None,
            }))
            .await
            .unwrap();
        let segments = text_of(&result)["segments"].clone();
        assert_eq!(segments[0]["startHour"], 8);
        assert_eq!(segments[0]["endHour"], 12);
        assert_eq!(segments[0]["label"], "Jan 10th");
    }

    #[tokio::test]
    async fn convert_duration_both_ways() {
        let result = server()
            .convert_duration(Parameters(ConvertDurationParams {
                text: Some("1:05:30".to_string()),
                seconds: Some(3930),
            }))
            .await
            .unwrap();
        let value = text_of(&result);
        assert_eq!(value["parsed"]["seconds"], 3930);
        assert_eq!(value["parsed"]["valid"], true);
        assert_eq!(value["formatted"]["text"], "1:05:30");

        let err = server()
            .convert_duration(Parameters(ConvertDurationParams {
                text: None,
                seconds: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }
}
