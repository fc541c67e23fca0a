use super::attributes::AttributeState;
use crate::core::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_CREATED_ATTRIBUTE: &str = "created_at";
pub const DEFAULT_UPDATED_ATTRIBUTE: &str = "updated_at";

/// Timestamp bookkeeping an entity type may opt into.
///
/// `touch` runs inside the insert and update paths, before the attribute
/// snapshot is taken, so the stamped attributes travel with the write.
pub trait TimestampPolicy: Send + Sync {
    fn uses_timestamps(&self) -> bool;
    fn touch(&self, attributes: &mut AttributeState, creating: bool);
}

/// Attribute names written by [`Timestamps`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampConfig {
    #[serde(default = "default_created_attribute")]
    pub created_attribute: String,
    #[serde(default = "default_updated_attribute")]
    pub updated_attribute: String,
}

fn default_created_attribute() -> String {
    DEFAULT_CREATED_ATTRIBUTE.to_string()
}

fn default_updated_attribute() -> String {
    DEFAULT_UPDATED_ATTRIBUTE.to_string()
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            created_attribute: default_created_attribute(),
            updated_attribute: default_updated_attribute(),
        }
    }
}

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Stamps RFC 3339 text: the updated attribute on every write, the created
/// attribute on insert.
#[derive(Clone)]
pub struct Timestamps {
    config: TimestampConfig,
    clock: Clock,
}

impl Timestamps {
    pub fn new(config: TimestampConfig) -> Self {
        Self {
            config,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &TimestampConfig {
        &self.config
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::new(TimestampConfig::default())
    }
}

impl fmt::Debug for Timestamps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timestamps")
            .field("config", &self.config)
            .finish()
    }
}

impl TimestampPolicy for Timestamps {
    fn uses_timestamps(&self) -> bool {
        true
    }

    fn touch(&self, attributes: &mut AttributeState, creating: bool) {
        let now = Value::Text((self.clock)().to_rfc3339());
        attributes.set(self.config.updated_attribute.clone(), now.clone());
        if creating && !attributes.contains(&self.config.created_attribute) {
            attributes.set(self.config.created_attribute.clone(), now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_clock() -> Clock {
        Arc::new(|| Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn creating_touch_sets_both_attributes() {
        let stamps = Timestamps::default().with_clock(fixed_clock());
        let mut attributes = AttributeState::new();
        stamps.touch(&mut attributes, true);

        let expected = Value::from("2024-05-01T12:00:00+00:00");
        assert_eq!(attributes.get("created_at"), Some(&expected));
        assert_eq!(attributes.get("updated_at"), Some(&expected));
    }

    #[test]
    fn updating_touch_leaves_created_attribute() {
        let stamps = Timestamps::new(TimestampConfig {
            created_attribute: "born".into(),
            updated_attribute: "seen".into(),
        })
        .with_clock(fixed_clock());
        let mut attributes = AttributeState::new();
        stamps.touch(&mut attributes, false);

        assert!(attributes.get("born").is_none());
        assert!(attributes.get("seen").is_some());
    }
}
