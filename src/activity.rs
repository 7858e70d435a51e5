//! Server-controlled feature flags deciding which optional enrollment steps
//! are active for a deployment.

use crate::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One switchable enrollment activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Image,
    Identification,
    Fingerprint,
}

impl Activity {
    pub const ALL: [Activity; 3] = [
        Activity::Image,
        Activity::Identification,
        Activity::Fingerprint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Image => "image",
            Activity::Identification => "identification",
            Activity::Fingerprint => "fingerprint",
        }
    }

    /// Activities this one cannot run without
    pub fn depends_on(&self) -> Option<Activity> {
        match self {
            Activity::Image => None,
            Activity::Identification | Activity::Fingerprint => Some(Activity::Image),
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enablement map for the optional steps. Photo/signature is mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityConfig {
    pub image: bool,
    pub identification: bool,
    pub fingerprint: bool,
}

impl Default for ActivityConfig {
    /// Used whenever the backend cannot be reached so the flow stays usable
    fn default() -> Self {
        Self {
            image: true,
            identification: true,
            fingerprint: true,
        }
    }
}

impl ActivityConfig {
    pub fn is_enabled(&self, activity: Activity) -> bool {
        match activity {
            Activity::Image => self.image,
            Activity::Identification => self.identification,
            Activity::Fingerprint => self.fingerprint,
        }
    }

    /// Toggle an activity, enforcing the dependency rule: nothing depends on
    /// a disabled activity, and image capture is never optional.
    pub fn set_enabled(
        &mut self,
        activity: Activity,
        enabled: bool,
    ) -> Result<(), ValidationError> {
        if activity == Activity::Image && !enabled {
            return Err(ValidationError::ImageMandatory);
        }
        if enabled {
            if let Some(required) = activity.depends_on() {
                if !self.is_enabled(required) {
                    return Err(ValidationError::ImageMandatory);
                }
            }
        }

        match activity {
            Activity::Image => self.image = enabled,
            Activity::Identification => self.identification = enabled,
            Activity::Fingerprint => self.fingerprint = enabled,
        }
        Ok(())
    }

    /// Force the mandatory activity back on after reading untrusted input
    pub fn normalized(mut self) -> Self {
        self.image = true;
        self
    }

    pub fn to_wire(&self) -> ActivityWire {
        ActivityWire {
            image: ActivityEntry {
                id: Some(1),
                status: self.image,
            },
            identification: ActivityEntry {
                id: Some(2),
                status: self.identification,
            },
            fingerprint: ActivityEntry {
                id: Some(3),
                status: self.fingerprint,
            },
        }
    }
}

impl From<ActivityWire> for ActivityConfig {
    fn from(wire: ActivityWire) -> Self {
        Self {
            image: wire.image.status,
            identification: wire.identification.status,
            fingerprint: wire.fingerprint.status,
        }
        .normalized()
    }
}

/// Backend JSON shape: `{image:{id,status}, identification:{..}, fingerprint:{..}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityWire {
    pub image: ActivityEntry,
    pub identification: ActivityEntry,
    pub fingerprint: ActivityEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(deserialize_with = "deserialize_flag")]
    pub status: bool,
}

/// Accepts `true`, `1`, `"1"`, `"true"` (and their negatives)
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Bool(b) => Ok(*b),
        serde_json::Value::Number(n) => Ok(n.as_i64().map(|n| n != 0).unwrap_or(false)),
        serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(D::Error::custom(format!("invalid status flag '{}'", other))),
        },
        serde_json::Value::Null => Ok(false),
        other => Err(D::Error::custom(format!("invalid status flag {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_everything() {
        let config = ActivityConfig::default();
        for activity in Activity::ALL {
            assert!(config.is_enabled(activity));
        }
    }

    #[test]
    fn test_image_cannot_be_disabled() {
        let mut config = ActivityConfig::default();
        assert_eq!(
            config.set_enabled(Activity::Image, false),
            Err(ValidationError::ImageMandatory)
        );
        assert!(config.image);
    }

    #[test]
    fn test_toggle_optional_activities() {
        let mut config = ActivityConfig::default();
        config.set_enabled(Activity::Identification, false).unwrap();
        config.set_enabled(Activity::Fingerprint, false).unwrap();
        assert!(!config.identification);
        assert!(!config.fingerprint);

        config.set_enabled(Activity::Fingerprint, true).unwrap();
        assert!(config.fingerprint);
    }

    #[test]
    fn test_wire_parsing_with_mixed_flags() {
        let json = r#"{
            "image": {"id": 1, "status": "1"},
            "identification": {"id": 2, "status": 0},
            "fingerprint": {"id": 3, "status": true}
        }"#;
        let wire: ActivityWire = serde_json::from_str(json).unwrap();
        let config = ActivityConfig::from(wire);

        assert_eq!(
            config,
            ActivityConfig {
                image: true,
                identification: false,
                fingerprint: true,
            }
        );
    }

    #[test]
    fn test_wire_forces_image_on() {
        let json = r#"{
            "image": {"status": false},
            "identification": {"status": true},
            "fingerprint": {"status": false}
        }"#;
        let wire: ActivityWire = serde_json::from_str(json).unwrap();
        assert!(ActivityConfig::from(wire).image);
    }

    #[test]
    fn test_wire_rejects_bad_flag() {
        let json = r#"{
            "image": {"status": "maybe"},
            "identification": {"status": true},
            "fingerprint": {"status": true}
        }"#;
        assert!(serde_json::from_str::<ActivityWire>(json).is_err());
    }

    #[test]
    fn test_to_wire_round_trips() {
        let config = ActivityConfig {
            image: true,
            identification: false,
            fingerprint: true,
        };
        let json = serde_json::to_string(&config.to_wire()).unwrap();
        let wire: ActivityWire = serde_json::from_str(&json).unwrap();
        assert_eq!(ActivityConfig::from(wire), config);
    }
}
