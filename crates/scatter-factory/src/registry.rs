//! Property name to handler table.
//!
//! Rules are declared once, templates such as `s_patternX_allow` (instances 1-9)
//! or `s_ecosystem_affinity_XX_ptr` (instances 01-99) are expanded into one
//! entry per index when the registry is built.

use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

use scatter_core::{PropertyId, PropertyName, Result};

use crate::rules;
use crate::{HandlerContext, HandlerFn, IndexedHandlerFn, PropertyChange, RegistryError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleOptions {
    /// Slider-like value, eligible for delayed timing policies.
    pub delayed: bool,
}

#[derive(Clone)]
enum RuleHandler {
    Plain(HandlerFn),
    Indexed(IndexedHandlerFn),
}

pub struct Rule {
    name: String,
    arity: Option<usize>,
    options: RuleOptions,
    handler: RuleHandler,
}

impl Rule {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HandlerContext<'_>, &PropertyChange) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity: None,
            options: RuleOptions::default(),
            handler: RuleHandler::Plain(Arc::new(f)),
        }
    }

    /// Template rule expanded into `arity` concrete properties.
    pub fn indexed<F>(template: impl Into<String>, arity: usize, f: F) -> Self
    where
        F: Fn(&HandlerContext<'_>, &PropertyChange, u8) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: template.into(),
            arity: Some(arity),
            options: RuleOptions::default(),
            handler: RuleHandler::Indexed(Arc::new(f)),
        }
    }

    pub fn slider(mut self) -> Self {
        self.options.delayed = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> RuleOptions {
        self.options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    /// `X`, 1 to 9
    Single,
    /// `XX`, 01 to 99
    Double,
}

impl Placeholder {
    fn find(template: &str) -> Option<Self> {
        if template.contains("XX") {
            Some(Placeholder::Double)
        } else if template.contains('X') {
            Some(Placeholder::Single)
        } else {
            None
        }
    }

    fn max(self) -> usize {
        match self {
            Placeholder::Single => 9,
            Placeholder::Double => 99,
        }
    }
}

/// Substitute `index` into the first placeholder of `template`.
pub fn expand_template(template: &str, index: u8) -> String {
    match Placeholder::find(template) {
        Some(Placeholder::Double) => template.replacen("XX", &format!("{:02}", index), 1),
        Some(Placeholder::Single) => template.replacen('X', &index.to_string(), 1),
        None => template.to_string(),
    }
}

/// A concrete registry entry.
pub struct RegisteredHandler {
    name: PropertyName,
    options: RuleOptions,
    index: Option<u8>,
    handler: RuleHandler,
}

impl RegisteredHandler {
    pub fn name(&self) -> &PropertyName {
        &self.name
    }

    pub fn options(&self) -> RuleOptions {
        self.options
    }

    /// Template index this entry was expanded with.
    pub fn index(&self) -> Option<u8> {
        self.index
    }

    pub fn invoke(&self, ctx: &HandlerContext<'_>, change: &PropertyChange) -> Result<()> {
        match (&self.handler, self.index) {
            (RuleHandler::Plain(f), _) => f(ctx, change),
            (RuleHandler::Indexed(f), Some(i)) => f(ctx, change, i),
            (RuleHandler::Indexed(f), None) => f(ctx, change, 1),
        }
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    rules: Vec<Rule>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn extend(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn build(self) -> std::result::Result<Registry, RegistryError> {
        let mut registry = Registry::default();
        for rule in self.rules {
            match rule.arity {
                None => registry.insert(RegisteredHandler {
                    name: PropertyName::new(&rule.name),
                    options: rule.options,
                    index: None,
                    handler: rule.handler,
                })?,
                Some(arity) => {
                    let placeholder = Placeholder::find(&rule.name)
                        .ok_or_else(|| RegistryError::MissingPlaceholder(rule.name.clone()))?;
                    if arity == 0 || arity > placeholder.max() {
                        return Err(RegistryError::ArityOutOfRange {
                            template: rule.name,
                            arity,
                            max: placeholder.max(),
                        });
                    }
                    for i in 1..=arity as u8 {
                        registry.insert(RegisteredHandler {
                            name: PropertyName::new(expand_template(&rule.name, i)),
                            options: rule.options,
                            index: Some(i),
                            handler: rule.handler.clone(),
                        })?;
                    }
                }
            }
        }
        debug!(handlers = registry.len(), "property registry built");
        Ok(registry)
    }
}

/// Immutable map from concrete property name to handler.
#[derive(Default)]
pub struct Registry {
    ids: FxHashMap<PropertyName, PropertyId>,
    entries: Vec<RegisteredHandler>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The full scatter rule table.
    ///
    /// # Panics
    ///
    /// When the built-in rule table is inconsistent.
    pub fn standard() -> Self {
        RegistryBuilder::new()
            .extend(rules::standard_rules())
            .build()
            .unwrap_or_else(|e| panic!("invalid built-in rule table: {}", e))
    }

    fn insert(&mut self, entry: RegisteredHandler) -> std::result::Result<(), RegistryError> {
        if self.ids.contains_key(&entry.name) {
            return Err(RegistryError::DuplicateProperty {
                name: entry.name.to_string(),
            });
        }
        let id = PropertyId(self.entries.len() as u32);
        self.ids.insert(entry.name.clone(), id);
        self.entries.push(entry);
        Ok(())
    }

    pub fn id(&self, name: &str) -> Option<PropertyId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: PropertyId) -> Option<&PropertyName> {
        self.entries.get(id.index()).map(|e| &e.name)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredHandler> {
        self.id(name).and_then(|id| self.by_id(id))
    }

    pub fn by_id(&self, id: PropertyId) -> Option<&RegisteredHandler> {
        self.entries.get(id.index())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &PropertyName> {
        self.entries.iter().map(|e| &e.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &HandlerContext<'_>, _: &PropertyChange) -> Result<()> {
        Ok(())
    }

    fn noop_indexed(_: &HandlerContext<'_>, _: &PropertyChange, _: u8) -> Result<()> {
        Ok(())
    }

    #[test]
    fn test_expand_template() {
        assert_eq!(expand_template("s_patternX_allow", 2), "s_pattern2_allow");
        assert_eq!(
            expand_template("s_ecosystem_affinity_XX_ptr", 3),
            "s_ecosystem_affinity_03_ptr"
        );
        assert_eq!(expand_template("s_instances_id_XX_rate", 20), "s_instances_id_20_rate");
    }

    #[test]
    fn test_indexed_expansion() {
        let registry = Registry::builder()
            .rule(Rule::indexed("s_patternX_allow", 3, noop_indexed))
            .rule(Rule::new("s_scale_default_value", noop).slider())
            .build()
            .unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get("s_pattern3_allow").unwrap().index(), Some(3));
        assert!(registry.get("s_pattern4_allow").is_none());
        assert!(registry.get("s_scale_default_value").unwrap().options().delayed);

        let id = registry.id("s_pattern2_allow").unwrap();
        assert_eq!(registry.name(id).unwrap().as_str(), "s_pattern2_allow");
    }

    #[test]
    fn test_collision_is_rejected() {
        let err = Registry::builder()
            .rule(Rule::indexed("s_patternX_allow", 3, noop_indexed))
            .rule(Rule::new("s_pattern2_allow", noop))
            .build()
            .err();
        assert_eq!(
            err,
            Some(RegistryError::DuplicateProperty {
                name: "s_pattern2_allow".into()
            })
        );
    }

    #[test]
    fn test_arity_bounds() {
        let too_many = Registry::builder()
            .rule(Rule::indexed("s_patternX_allow", 10, noop_indexed))
            .build();
        assert!(matches!(
            too_many.err(),
            Some(RegistryError::ArityOutOfRange { max: 9, .. })
        ));

        let zero = Registry::builder()
            .rule(Rule::indexed("s_instances_id_XX_rate", 0, noop_indexed))
            .build();
        assert!(matches!(
            zero.err(),
            Some(RegistryError::ArityOutOfRange { arity: 0, .. })
        ));

        let ok = Registry::builder()
            .rule(Rule::indexed("s_instances_id_XX_rate", 99, noop_indexed))
            .build()
            .unwrap();
        assert!(ok.contains("s_instances_id_99_rate"));
    }

    #[test]
    fn test_missing_placeholder() {
        let err = Registry::builder()
            .rule(Rule::indexed("s_pattern_allow", 3, noop_indexed))
            .build()
            .err();
        assert_eq!(
            err,
            Some(RegistryError::MissingPlaceholder("s_pattern_allow".into()))
        );
    }

    #[test]
    fn test_standard_table_builds() {
        let registry = Registry::standard();
        assert!(registry.contains("s_scale_default_value"));
        assert!(registry.contains("s_ecosystem_affinity_03_ptr"));
        assert!(registry.contains("s_instances_id_20_color"));
        assert!(registry.contains("s_pattern1_mask_noise_is_random_seed"));
        let unique: std::collections::HashSet<_> = registry.names().collect();
        assert_eq!(unique.len(), registry.len());
    }
}
