use serde::{Deserialize, Serialize};

use crate::{
    Entity, EntityId, InputState, ModifierKeys, PropertyName, Result, SelectionScope, StableId,
    Value,
};

/// A surface an entity is scattered onto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    pub name: String,
    pub stable_id: StableId,
}

impl Surface {
    pub fn new(name: impl Into<String>, stable_id: StableId) -> Self {
        Self {
            name: name.into(),
            stable_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorFit {
    #[default]
    Auto,
    Horizontal,
    Vertical,
}

impl SensorFit {
    pub fn index(self) -> i64 {
        match self {
            SensorFit::Auto => 0,
            SensorFit::Horizontal => 1,
            SensorFit::Vertical => 2,
        }
    }
}

/// Distances stored on the camera itself, overriding the per-system ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraDistances {
    pub visibility_min: f64,
    pub visibility_max: f64,
    pub fading_min: f64,
    pub fading_max: f64,
}

impl Default for CameraDistances {
    fn default() -> Self {
        Self {
            visibility_min: 0.0,
            visibility_max: 75.0,
            fading_min: 30.0,
            fading_max: 40.0,
        }
    }
}

/// Active scene camera as observed by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub lens: f64,
    pub sensor_width: f64,
    pub sensor_height: f64,
    pub sensor_fit: SensorFit,
    pub shift: [f64; 2],
    pub resolution: [u32; 2],
    /// Frustum boosts (lod, clipping).
    pub boost: [f64; 2],
    pub distances: CameraDistances,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            location: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            lens: 50.0,
            sensor_width: 36.0,
            sensor_height: 24.0,
            sensor_fit: SensorFit::Auto,
            shift: [0.0, 0.0],
            resolution: [1920, 1080],
            boost: [0.0, 0.0],
            distances: CameraDistances::default(),
        }
    }
}

impl CameraState {
    /// Sensor size the lens maps against.
    pub fn effective_sensor(&self) -> f64 {
        match self.sensor_fit {
            SensorFit::Vertical => self.sensor_height,
            _ => self.sensor_width,
        }
    }
}

/// The host application: property store, selection, input and scene queries.
pub trait SceneHost: Send + Sync {
    fn entity(&self, name: &str) -> Option<Entity>;

    fn entity_by_id(&self, id: EntityId) -> Option<Entity>;

    fn entities(&self) -> Vec<Entity>;

    /// Scatter systems whose `group` is `group`.
    fn group_members(&self, group: &str) -> Vec<Entity>;

    /// Selected systems relative to `source`, in a stable order.
    fn selected_entities(&self, scope: SelectionScope, source: &Entity) -> Vec<Entity>;

    fn read_property(&self, entity: EntityId, property: &str) -> Option<Value>;

    /// Store a value without triggering any update.
    fn write_property(&self, entity: EntityId, property: &str, value: Value) -> Result<()>;

    fn property_names(&self, entity: EntityId) -> Vec<PropertyName>;

    fn modifier_keys(&self) -> ModifierKeys;

    fn input_state(&self) -> InputState;

    fn active_camera(&self) -> Option<CameraState>;

    fn surfaces(&self, entity: EntityId) -> Vec<Surface>;
}
