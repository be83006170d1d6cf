//! Typed bridge records.
//!
//! Transports hand the cache fully validated records. Raw JSON from a bridge
//! goes through [`Resource::from_value`] exactly once, so nothing above the
//! transport boundary deals with loose maps.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumIter, EnumString};

use crate::errors::Error;
use crate::state::DeviceState;

type Result<T> = std::result::Result<T, Error>;

/// The kinds of record a bridge exposes; one cache collection each.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    Light,
    GroupedLight,
    Room,
    Scene,
}

impl ResourceKind {
    /// Whether records of this kind carry a [`DeviceState`] that can be written.
    pub fn is_controllable(&self) -> bool {
        matches!(self, ResourceKind::Light | ResourceKind::GroupedLight)
    }
}

/// A single light.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: DeviceState,
    /// Id of the room this light belongs to.
    pub room: Option<String>,
}

/// The aggregate control surface of a room: writing here changes every light
/// in the room in one request.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedLight {
    pub id: String,
    /// Id of the room owning this group.
    pub owner: Option<String>,
    #[serde(default)]
    pub state: DeviceState,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lights: Vec<String>,
    pub grouped_light: Option<String>,
}

/// A stored preset of light states, recalled as a whole.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub name: String,
    /// Id of the room the scene applies to.
    pub group: Option<String>,
}

/// Any record held by the cache.
///
/// ```
/// use hue_lights_rs::{Resource, ResourceKind};
/// use serde_json::json;
///
/// let light = Resource::from_value(
///     ResourceKind::Light,
///     json!({"id": "l1", "name": "Desk", "state": {"on": true, "brightness": 70.0}}),
/// )
/// .unwrap();
/// assert_eq!(light.id(), "l1");
/// assert_eq!(light.state().unwrap().get_brightness(), Some(70.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    Light(Light),
    GroupedLight(GroupedLight),
    Room(Room),
    Scene(Scene),
}

impl Resource {
    /// Validate a raw record of the given kind.
    ///
    /// Fails with [`Error::InvalidRecord`] when required fields are missing,
    /// have the wrong type, or the id is blank. State values are clamped.
    pub fn from_value(kind: ResourceKind, value: Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| Error::invalid_record(kind, e);
        let resource = match kind {
            ResourceKind::Light => {
                let mut light: Light = serde_json::from_value(value).map_err(invalid)?;
                light.state = light.state.normalized();
                Resource::Light(light)
            }
            ResourceKind::GroupedLight => {
                let mut group: GroupedLight = serde_json::from_value(value).map_err(invalid)?;
                group.state = group.state.normalized();
                Resource::GroupedLight(group)
            }
            ResourceKind::Room => Resource::Room(serde_json::from_value(value).map_err(invalid)?),
            ResourceKind::Scene => Resource::Scene(serde_json::from_value(value).map_err(invalid)?),
        };

        if resource.id().trim().is_empty() {
            return Err(Error::invalid_record(kind, "blank id"));
        }
        Ok(resource)
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Light(_) => ResourceKind::Light,
            Resource::GroupedLight(_) => ResourceKind::GroupedLight,
            Resource::Room(_) => ResourceKind::Room,
            Resource::Scene(_) => ResourceKind::Scene,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Resource::Light(l) => &l.id,
            Resource::GroupedLight(g) => &g.id,
            Resource::Room(r) => &r.id,
            Resource::Scene(s) => &s.id,
        }
    }

    /// Display name; grouped lights have none of their own.
    pub fn name(&self) -> Option<&str> {
        match self {
            Resource::Light(l) => Some(&l.name),
            Resource::GroupedLight(_) => None,
            Resource::Room(r) => Some(&r.name),
            Resource::Scene(s) => Some(&s.name),
        }
    }

    pub fn state(&self) -> Option<&DeviceState> {
        match self {
            Resource::Light(l) => Some(&l.state),
            Resource::GroupedLight(g) => Some(&g.state),
            Resource::Room(_) | Resource::Scene(_) => None,
        }
    }

    /// A copy of this record with `update` merged into its state.
    ///
    /// Returns `None` for kinds without state.
    pub fn patched(&self, update: &DeviceState) -> Option<Resource> {
        let mut next = self.clone();
        match &mut next {
            Resource::Light(l) => l.state.merge(update),
            Resource::GroupedLight(g) => g.state.merge(update),
            Resource::Room(_) | Resource::Scene(_) => return None,
        }
        Some(next)
    }

    pub fn as_light(&self) -> Option<&Light> {
        match self {
            Resource::Light(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_grouped_light(&self) -> Option<&GroupedLight> {
        match self {
            Resource::GroupedLight(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_room(&self) -> Option<&Room> {
        match self {
            Resource::Room(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_scene(&self) -> Option<&Scene> {
        match self {
            Resource::Scene(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kind_names() {
        let names: Vec<String> = ResourceKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(names, ["light", "grouped_light", "room", "scene"]);
        assert_eq!(
            ResourceKind::from_str("grouped_light").unwrap(),
            ResourceKind::GroupedLight
        );
    }

    #[test]
    fn test_from_value_rejects_missing_fields() {
        let err = Resource::from_value(ResourceKind::Room, json!({"id": "r1"})).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidRecord {
                kind: ResourceKind::Room,
                ..
            }
        ));
    }

    #[test]
    fn test_from_value_rejects_blank_id() {
        let err = Resource::from_value(ResourceKind::Scene, json!({"id": " ", "name": "Relax"}))
            .unwrap_err();
        assert_eq!(
            err,
            Error::invalid_record(ResourceKind::Scene, "blank id")
        );
    }

    #[test]
    fn test_from_value_clamps_state() {
        let group = Resource::from_value(
            ResourceKind::GroupedLight,
            json!({"id": "g1", "owner": "r1", "state": {"brightness": 300.0}}),
        )
        .unwrap();
        assert_eq!(group.state().unwrap().get_brightness(), Some(100.0));
    }

    #[test]
    fn test_tagged_serialization() {
        let room = Resource::Room(Room {
            id: "r1".into(),
            name: "Den".into(),
            lights: vec!["l1".into()],
            grouped_light: None,
        });
        let value = serde_json::to_value(&room).unwrap();
        assert_eq!(
            value,
            json!({"type": "room", "id": "r1", "name": "Den", "lights": ["l1"]})
        );
        let back: Resource = serde_json::from_value(value).unwrap();
        assert_eq!(back, room);
    }

    #[test]
    fn test_patched_keeps_original() {
        let light = Resource::Light(Light {
            id: "l1".into(),
            name: "Desk".into(),
            state: DeviceState::power(false),
            room: None,
        });
        let patched = light.patched(&DeviceState::power(true)).unwrap();
        assert_eq!(patched.state().unwrap().get_on(), Some(true));
        assert_eq!(light.state().unwrap().get_on(), Some(false));

        let scene = Resource::Scene(Scene {
            id: "s1".into(),
            name: "Relax".into(),
            group: None,
        });
        assert!(scene.patched(&DeviceState::power(true)).is_none());
    }
}
