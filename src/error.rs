use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunsheetError {
    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Schedule entry not found: {0}")]
    EntryNotFound(String),

    #[error("No schedule is open for event: {0}")]
    ScheduleNotOpen(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
