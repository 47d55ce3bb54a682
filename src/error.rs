use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::warn;

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// The full error taxonomy for this crate: parser failures, semantically-empty
/// rules, engine-time occurrence misses, and declared-but-unimplemented features.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("could not parse rule text near: {fragment:?}")]
    Parse { fragment: String },

    #[error("rule is invalid: {message}")]
    InvalidRule {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("no next occurrence found within the probe budget")]
    NoOccurrence,

    #[error("unsupported feature: {feature}")]
    UnsupportedFeature { feature: &'static str },

    #[error("unrecognized time zone: {zone}")]
    InvalidTimeZone { zone: String },
}

impl ScheduleError {
    pub fn parse(fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        warn!(target: "chronophrase::error", %fragment, "parse error");
        ScheduleError::Parse { fragment }
    }

    pub fn invalid_rule(message: impl Into<String>) -> Self {
        Self::invalid_rule_with_details(message, None)
    }

    pub fn invalid_rule_with_details(message: impl Into<String>, details: Option<JsonValue>) -> Self {
        let message = message.into();
        warn!(target: "chronophrase::error", %message, "invalid rule");
        ScheduleError::InvalidRule { message, details }
    }

    pub fn no_occurrence() -> Self {
        warn!(target: "chronophrase::error", "no next occurrence within probe budget");
        ScheduleError::NoOccurrence
    }

    pub fn unsupported_feature(feature: &'static str) -> Self {
        warn!(target: "chronophrase::error", feature, "unsupported feature requested");
        ScheduleError::UnsupportedFeature { feature }
    }

    pub fn invalid_time_zone(zone: impl Into<String>) -> Self {
        let zone = zone.into();
        warn!(target: "chronophrase::error", %zone, "invalid time zone");
        ScheduleError::InvalidTimeZone { zone }
    }
}
