use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::PropertyName;

pub type EntityId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Scatter,
    Group,
}

/// A scatter system, or a group aggregating several of them.
///
/// Entities are snapshots handed out by the host; the property values live in
/// the host's store and are read through [`crate::SceneHost`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    /// Object the system is scattered on. Selection scopes are computed per emitter.
    pub emitter: String,
    /// Name of the containing group, if any.
    pub group: Option<String>,
    /// Owned by another file. Only visibility edits are honoured.
    pub linked: bool,
    /// Property names fan-out must not overwrite on this entity.
    pub locked: BTreeSet<String>,
    /// Name of the procedural graph driving this entity.
    pub graph: Option<String>,
}

impl Entity {
    pub fn scatter(name: impl Into<String>, emitter: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            graph: Some(format!(".engine {}", name)),
            name,
            kind: EntityKind::Scatter,
            emitter: emitter.into(),
            group: None,
            linked: false,
            locked: BTreeSet::new(),
        }
    }

    pub fn group(name: impl Into<String>, emitter: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: EntityKind::Group,
            emitter: emitter.into(),
            group: None,
            linked: false,
            locked: BTreeSet::new(),
            graph: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_locked(mut self, property: impl Into<String>) -> Self {
        self.locked.insert(property.into());
        self
    }

    pub fn as_linked(mut self) -> Self {
        self.linked = true;
        self
    }

    pub fn is_group(&self) -> bool {
        self.kind == EntityKind::Group
    }

    pub fn is_locked(&self, property: &PropertyName) -> bool {
        self.locked.contains(property.as_str())
    }
}

/// A property value as stored by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Vector([f64; 3]),
    Color([f64; 4]),
    Enum(String),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Enum(s) | Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<[f64; 3]> {
        match self {
            Value::Vector(v) => Some(*v),
            Value::Color([r, g, b, _]) => Some([*r, *g, *b]),
            _ => None,
        }
    }

    /// RGBA view of a color-like value, a three component vector gets alpha 1.
    pub fn to_rgba(&self) -> Option<Value> {
        match self {
            Value::Color(c) => Some(Value::Color(*c)),
            Value::Vector([r, g, b]) => Some(Value::Color([*r, *g, *b, 1.0])),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Vector(_) => "vector",
            Value::Color(_) => "color",
            Value::Enum(_) => "enum",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Vector([x, y, z]) => write!(f, "({}, {}, {})", x, y, z),
            Value::Color([r, g, b, a]) => write!(f, "({}, {}, {}, {})", r, g, b, a),
            Value::Enum(s) | Value::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<[f64; 3]> for Value {
    fn from(v: [f64; 3]) -> Self {
        Value::Vector(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierKeys {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

impl ModifierKeys {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::default()
        }
    }
}

/// Pointer/keyboard state observed at the moment of a property write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputState {
    #[default]
    Idle,
    /// A slider or field is being dragged.
    Press,
    /// Value confirmed with Enter.
    Confirm,
}

/// Which selected entities batch fan-out considers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionScope {
    /// Selected systems sharing the source's emitter.
    #[default]
    ActiveEmitter,
    /// Selected systems across every emitter.
    AllEmitters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_normalisation() {
        assert_eq!(
            Value::Vector([0.1, 0.2, 0.3]).to_rgba(),
            Some(Value::Color([0.1, 0.2, 0.3, 1.0]))
        );
        assert_eq!(Value::Float(1.0).to_rgba(), None);
    }

    #[test]
    fn test_entity_lock() {
        let e = Entity::scatter("Grass", "Plane").with_locked("s_scale_default_value");
        assert!(e.is_locked(&PropertyName::from("s_scale_default_value")));
        assert!(!e.is_locked(&PropertyName::from("s_scale_random_factor")));
        assert!(!e.is_group());
        assert!(Entity::group("Meadow", "Plane").is_group());
    }

    #[test]
    fn test_value_serde_roundtrip() {
        let v = Value::Enum("manual_all".into());
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"enum","value":"manual_all"}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
