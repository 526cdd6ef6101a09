use chrono_tz::Tz;

use crate::error::RunsheetError;
use crate::schedule::duration::is_duration_valid;
use crate::schedule::event::parse_timezone;

pub const TIMEZONE_ENV_VAR: &str = "RUNSHEET_TIMEZONE";
pub const SETUP_TIME_ENV_VAR: &str = "RUNSHEET_SETUP_TIME";

pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_SETUP_TIME: &str = "0:10:00";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Zone used for events that do not name one, and for availability display.
    pub timezone: Tz,
    /// Setup time applied when a tool call does not give one.
    pub default_setup_time: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            default_setup_time: DEFAULT_SETUP_TIME.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Bad values are logged and replaced by
    /// their defaults so the server still starts.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(TIMEZONE_ENV_VAR) {
            match parse_timezone(raw.trim()) {
                Ok(tz) => config.timezone = tz,
                Err(e) => tracing::error!("{TIMEZONE_ENV_VAR}: {e}; using {DEFAULT_TIMEZONE}"),
            }
        }

        if let Some(raw) = lookup(SETUP_TIME_ENV_VAR) {
            match validate_setup_time(raw.trim()) {
                Ok(setup) => config.default_setup_time = setup,
                Err(e) => tracing::error!("{SETUP_TIME_ENV_VAR}: {e}; using {DEFAULT_SETUP_TIME}"),
            }
        }

        config
    }
}

fn validate_setup_time(raw: &str) -> Result<String, RunsheetError> {
    if is_duration_valid(raw) {
        Ok(raw.to_string())
    } else {
        Err(RunsheetError::InvalidDuration(raw.to_string()))
    }
}
