//! System prompt assembly

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::tools::ToolCatalog;

/// Zone used when an agent has none configured
pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::America::New_York;

/// Short ids accepted alongside IANA names
const ZONE_ALIASES: &[(&str, &str)] = &[
    ("nyc", "America/New_York"),
    ("la", "America/Los_Angeles"),
    ("london", "Europe/London"),
];

/// Resolve an agent's zone setting; unknown ids fall back to New York
pub fn resolve_time_zone(id: Option<&str>) -> Tz {
    let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
        return DEFAULT_TIME_ZONE;
    };
    let name = ZONE_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(id))
        .map_or(id, |(_, name)| *name);

    name.parse().unwrap_or_else(|_| {
        warn!("Unknown time zone {:?}, using {}", id, DEFAULT_TIME_ZONE);
        DEFAULT_TIME_ZONE
    })
}

/// Builds the system prompt sent with every completion round
pub struct ContextBuilder;

impl ContextBuilder {
    /// Build the prompt for the current time in the agent's zone
    pub fn system_prompt(agent_prompt: &str, time_zone: Option<&str>, catalog: &ToolCatalog) -> String {
        Self::system_prompt_at(agent_prompt, resolve_time_zone(time_zone), catalog, Utc::now())
    }

    /// Current time, then the agent's own prompt, then tool hints
    pub fn system_prompt_at(
        agent_prompt: &str,
        zone: Tz,
        catalog: &ToolCatalog,
        now: DateTime<Utc>,
    ) -> String {
        let prompt = format!("{}\n\n{}", Self::date_time_line(zone, now), agent_prompt);
        let mut prompt = prompt.trim().to_string();
        prompt.push_str(&catalog.hints());
        prompt
    }

    fn date_time_line(zone: Tz, now: DateTime<Utc>) -> String {
        format!(
            "Current date and time: {}",
            now.with_timezone(&zone)
                .format("%A, %B %-d, %Y at %-I:%M %p %Z")
        )
    }
}
