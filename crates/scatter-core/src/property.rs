use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name of an entity property, e.g. `s_scale_default_value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyName(Arc<str>);

impl PropertyName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `*_seed` properties never participate in synchronization.
    pub fn is_seed(&self) -> bool {
        self.0.ends_with("_seed")
    }

    /// Button-like booleans that roll a new seed when set.
    pub fn is_random_seed_trigger(&self) -> bool {
        self.0.ends_with("_is_random_seed")
    }

    pub fn category(&self) -> Option<PropertyCategory> {
        PropertyCategory::classify(&self.0)
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PropertyName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PropertyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PropertyName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PropertyName {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

/// Dense identifier assigned to every concrete property when the registry is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyId(pub u32);

impl PropertyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Feature family a property belongs to, derived from its `s_<category>` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyCategory {
    Surface,
    Distribution,
    Mask,
    Scale,
    Rot,
    Pattern,
    Abiotic,
    Proximity,
    Ecosystem,
    Push,
    Wind,
    Visibility,
    Instances,
    Display,
}

impl PropertyCategory {
    pub const ALL: [PropertyCategory; 14] = [
        PropertyCategory::Surface,
        PropertyCategory::Distribution,
        PropertyCategory::Mask,
        PropertyCategory::Scale,
        PropertyCategory::Rot,
        PropertyCategory::Pattern,
        PropertyCategory::Abiotic,
        PropertyCategory::Proximity,
        PropertyCategory::Ecosystem,
        PropertyCategory::Push,
        PropertyCategory::Wind,
        PropertyCategory::Visibility,
        PropertyCategory::Instances,
        PropertyCategory::Display,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            PropertyCategory::Surface => "s_surface",
            PropertyCategory::Distribution => "s_distribution",
            PropertyCategory::Mask => "s_mask",
            PropertyCategory::Scale => "s_scale",
            PropertyCategory::Rot => "s_rot",
            PropertyCategory::Pattern => "s_pattern",
            PropertyCategory::Abiotic => "s_abiotic",
            PropertyCategory::Proximity => "s_proximity",
            PropertyCategory::Ecosystem => "s_ecosystem",
            PropertyCategory::Push => "s_push",
            PropertyCategory::Wind => "s_wind",
            PropertyCategory::Visibility => "s_visibility",
            PropertyCategory::Instances => "s_instances",
            PropertyCategory::Display => "s_display",
        }
    }

    pub fn classify(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| name.starts_with(c.prefix()))
    }

    /// Whether a new channel synchronizes this category.
    pub fn enabled_by_default(self) -> bool {
        !matches!(self, PropertyCategory::Surface | PropertyCategory::Mask)
    }
}

impl fmt::Display for PropertyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix()[2..])
    }
}

/// Per-category enable switches of a synchronization channel.
///
/// Persisted as the list of enabled categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PropertyCategory>", into = "Vec<PropertyCategory>")]
pub struct CategoryMask(BTreeMap<PropertyCategory, bool>);

impl From<Vec<PropertyCategory>> for CategoryMask {
    fn from(enabled: Vec<PropertyCategory>) -> Self {
        let mut mask = Self::none();
        for c in enabled {
            mask.set(c, true);
        }
        mask
    }
}

impl From<CategoryMask> for Vec<PropertyCategory> {
    fn from(mask: CategoryMask) -> Self {
        mask.enabled().collect()
    }
}

impl Default for CategoryMask {
    fn default() -> Self {
        Self(
            PropertyCategory::ALL
                .into_iter()
                .map(|c| (c, c.enabled_by_default()))
                .collect(),
        )
    }
}

impl CategoryMask {
    pub fn none() -> Self {
        Self(PropertyCategory::ALL.into_iter().map(|c| (c, false)).collect())
    }

    pub fn is_enabled(&self, category: PropertyCategory) -> bool {
        self.0.get(&category).copied().unwrap_or(false)
    }

    pub fn set(&mut self, category: PropertyCategory, enabled: bool) {
        self.0.insert(category, enabled);
    }

    pub fn with(mut self, category: PropertyCategory, enabled: bool) -> Self {
        self.set(category, enabled);
        self
    }

    pub fn enabled(&self) -> impl Iterator<Item = PropertyCategory> + '_ {
        self.0.iter().filter(|(_, on)| **on).map(|(c, _)| *c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            PropertyCategory::classify("s_scale_default_value"),
            Some(PropertyCategory::Scale)
        );
        assert_eq!(
            PropertyCategory::classify("s_distribution_density"),
            Some(PropertyCategory::Distribution)
        );
        assert_eq!(
            PropertyCategory::classify("s_display_method"),
            Some(PropertyCategory::Display)
        );
        assert_eq!(PropertyCategory::classify("hide_viewport"), None);
        assert_eq!(PropertyCategory::classify("s_gr_scale_boost_value"), None);
    }

    #[test]
    fn test_name_serializes_as_plain_string() {
        let name = PropertyName::from("s_scale_random_seed");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"s_scale_random_seed\"");
        let back: PropertyName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
        assert!(back.is_seed());
    }

    #[test]
    fn test_seed_suffixes() {
        let seed = PropertyName::from("s_rot_random_seed");
        let trigger = PropertyName::from("s_rot_random_is_random_seed");
        assert!(seed.is_seed());
        assert!(!seed.is_random_seed_trigger());
        assert!(trigger.is_seed());
        assert!(trigger.is_random_seed_trigger());
        assert!(!PropertyName::from("s_rot_random_allow").is_seed());
    }

    #[test]
    fn test_default_mask() {
        let mask = CategoryMask::default();
        assert!(!mask.is_enabled(PropertyCategory::Surface));
        assert!(!mask.is_enabled(PropertyCategory::Mask));
        assert!(mask.is_enabled(PropertyCategory::Scale));
        assert_eq!(mask.enabled().count(), 12);
        assert_eq!(PropertyCategory::Rot.to_string(), "rot");
    }
}
