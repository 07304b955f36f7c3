//! Named groups of entities that mirror each other's edits, per category.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use scatter_core::{CategoryMask, Entity, PropertyCategory, PropertyName, Result, Suppress, Value};

use crate::{DispatchError, DispatchResult, Dispatcher, FanOutReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncChannel {
    pub name: String,
    /// Member entity names. May reference entities that no longer exist.
    pub members: Vec<String>,
    #[serde(default)]
    pub categories: CategoryMask,
}

impl SyncChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            categories: CategoryMask::default(),
        }
    }

    /// Returns false when `member` was already present.
    pub fn add_member(&mut self, member: impl Into<String>) -> bool {
        let member = member.into();
        if self.has_member(&member) {
            return false;
        }
        self.members.push(member);
        true
    }

    pub fn remove_member(&mut self, member: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != member);
        self.members.len() != before
    }

    pub fn has_member(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }

    pub fn set_category(&mut self, category: PropertyCategory, enabled: bool) {
        self.categories.set(category, enabled);
    }

    pub fn is_enabled(&self, category: PropertyCategory) -> bool {
        self.categories.is_enabled(category)
    }
}

/// Channels in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncChannels(Vec<SyncChannel>);

impl SyncChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty channel named after the first free `ChannelNN`.
    pub fn create(&mut self) -> &mut SyncChannel {
        let name = (1..)
            .map(|i| format!("Channel{:02}", i))
            .find(|n| self.get(n).is_none())
            .unwrap_or_default();
        self.0.push(SyncChannel::new(name));
        let last = self.0.len() - 1;
        &mut self.0[last]
    }

    /// Returns false when a channel with the same name exists.
    pub fn insert(&mut self, channel: SyncChannel) -> bool {
        if self.get(&channel.name).is_some() {
            return false;
        }
        self.0.push(channel);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<SyncChannel> {
        let idx = self.0.iter().position(|c| c.name == name)?;
        Some(self.0.remove(idx))
    }

    pub fn get(&self, name: &str) -> Option<&SyncChannel> {
        self.0.iter().find(|c| c.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SyncChannel> {
        self.0.iter_mut().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncChannel> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn channels_with_member<'a>(
        &'a self,
        member: &'a str,
    ) -> impl Iterator<Item = &'a SyncChannel> + 'a {
        self.0.iter().filter(move |c| c.has_member(member))
    }

    /// Follow an entity rename. Returns the number of memberships renamed.
    pub fn rename_member(&mut self, old: &str, new: &str) -> usize {
        let mut touched = 0;
        for channel in &mut self.0 {
            for member in channel.members.iter_mut().filter(|m| m.as_str() == old) {
                *member = new.to_string();
                touched += 1;
            }
        }
        touched
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Dispatcher {
    /// Mirror `value` onto the other members of every channel `source` belongs to.
    pub fn propagate(&self, source: &Entity, property: &PropertyName, value: &Value) -> FanOutReport {
        let mut report = FanOutReport::default();
        let Some(category) = property.category() else {
            return report;
        };
        // Snapshot so handlers may edit channels while we write.
        let channels: Vec<SyncChannel> = self
            .channels()
            .channels_with_member(&source.name)
            .filter(|c| c.is_enabled(category))
            .cloned()
            .collect();
        if channels.is_empty() {
            return report;
        }

        let _guard = self.gate().suppress(Suppress::FAN_OUT);
        for channel in &channels {
            for member in channel.members.iter().filter(|m| **m != source.name) {
                match self.host().entity(member) {
                    Some(target) => self.fan_out_one(&target, property, value, &mut report),
                    None => {
                        debug!(channel = %channel.name, member = %member, "stale channel member");
                        report.stale.push(member.clone());
                    }
                }
            }
        }
        report
    }

    /// Copy every enabled-category property of the channel's first resolvable
    /// member onto all the others.
    pub fn ensure_synchronized(&self, channel: &str) -> DispatchResult<FanOutReport> {
        let channel = self
            .channels()
            .get(channel)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownChannel(channel.to_string()))?;

        let mut report = FanOutReport::default();
        let mut resolved = Vec::new();
        for member in &channel.members {
            match self.host().entity(member) {
                Some(e) => resolved.push(e),
                None => report.stale.push(member.clone()),
            }
        }
        let Some((source, targets)) = resolved.split_first() else {
            return Ok(report);
        };

        let _guard = self.gate().suppress(Suppress::FAN_OUT);
        for property in self.host().property_names(source.id) {
            if property.is_seed() {
                continue;
            }
            let Some(category) = property.category() else {
                continue;
            };
            if !channel.is_enabled(category) {
                continue;
            }
            let Some(value) = self.host().read_property(source.id, property.as_str()) else {
                continue;
            };
            for target in targets {
                self.fan_out_one(target, &property, &value, &mut report);
            }
        }
        info!(
            channel = %channel.name,
            source = %source.name,
            updated = report.updated.len(),
            "channel synchronized"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_picks_first_free_name() {
        let mut channels = SyncChannels::new();
        channels.create();
        channels.create();
        assert!(channels.get("Channel01").is_some());
        assert!(channels.get("Channel02").is_some());

        channels.remove("Channel01");
        assert_eq!(channels.create().name, "Channel01");
        assert_eq!(channels.len(), 2);
    }

    #[test]
    fn test_members_deduplicate() {
        let mut channel = SyncChannel::new("Forest");
        assert!(channel.add_member("Pine"));
        assert!(!channel.add_member("Pine"));
        assert!(channel.add_member("Fern"));
        assert_eq!(channel.members, vec!["Pine", "Fern"]);
        assert!(channel.remove_member("Pine"));
        assert!(!channel.remove_member("Pine"));
    }

    #[test]
    fn test_category_defaults() {
        let mut channel = SyncChannel::new("Forest");
        assert!(channel.is_enabled(PropertyCategory::Scale));
        assert!(!channel.is_enabled(PropertyCategory::Surface));
        channel.set_category(PropertyCategory::Scale, false);
        assert!(!channel.is_enabled(PropertyCategory::Scale));
    }

    #[test]
    fn test_channels_persist_as_json() {
        let mut channels = SyncChannels::new();
        let channel = channels.create();
        channel.add_member("Pine");
        channel.set_category(PropertyCategory::Distribution, false);
        channels.rename_member("Pine", "Spruce");

        let json = channels.to_json().unwrap();
        let back = SyncChannels::from_json(&json).unwrap();
        assert_eq!(back, channels);
        assert_eq!(back.channels_with_member("Spruce").count(), 1);
        assert!(SyncChannels::from_json("{").is_err());
    }
}
