use scatter_core::{
    Entity, GraphBackend, NodeFlag, NodeHandle, Result, ScatterError, Slot, Value,
};
use tracing::trace;

/// Keyword node holding `"<distribution> <space> <surface>"`.
pub const KEYWORD_NODE: &str = "info_keyword";

pub const TEXTURE_PREFIX: &str = ".TEXTURE ";
pub const DEFAULT_TEXTURE: &str = ".TEXTURE *DEFAULT* MKV";

/// Router node families used to switch a feature in or out of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Vec,
    Geo,
    Float,
    Mtx,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Vec => "RR_VEC",
            Route::Geo => "RR_GEO",
            Route::Float => "RR_FLOAT",
            Route::Mtx => "RR_MTX",
        }
    }
}

/// Name of the texture sub-graph for a user facing texture name.
pub fn texture_tree_name(value: &str) -> String {
    let name = if value.starts_with(TEXTURE_PREFIX) {
        value.to_string()
    } else {
        format!("{}{}", TEXTURE_PREFIX, value)
    };
    if name == TEXTURE_PREFIX {
        DEFAULT_TEXTURE.to_string()
    } else {
        name
    }
}

/// Mutations of one entity's graph. Every method reads first and only writes
/// when the graph differs, returning whether a write happened.
pub struct GraphOps<'a> {
    backend: &'a dyn GraphBackend,
    entity: &'a Entity,
}

impl<'a> GraphOps<'a> {
    pub fn new(backend: &'a dyn GraphBackend, entity: &'a Entity) -> Result<Self> {
        if entity.graph.is_none() {
            return Err(ScatterError::EngineMissing(entity.name.clone()));
        }
        Ok(Self { backend, entity })
    }

    pub fn entity(&self) -> &Entity {
        self.entity
    }

    fn resolve(&self, path: &str) -> Result<NodeHandle> {
        self.backend
            .node(self.entity.id, path)
            .ok_or_else(|| ScatterError::NodeNotFound {
                entity: self.entity.name.clone(),
                path: path.to_string(),
            })
    }

    pub fn read(&self, path: &str, slot: Slot) -> Result<Value> {
        let node = self.resolve(path)?;
        self.backend.read(&node, slot)
    }

    pub fn set(&self, path: &str, slot: Slot, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        let node = self.resolve(path)?;
        if self.backend.read(&node, slot)? == value {
            return Ok(false);
        }
        trace!(entity = %self.entity.name, path, ?slot, %value, "graph write");
        self.backend.write(&node, slot, value)?;
        Ok(true)
    }

    pub fn set_input(&self, path: &str, index: usize, value: impl Into<Value>) -> Result<bool> {
        self.set(path, Slot::Input(index), value)
    }

    pub fn set_constant(&self, path: &str, value: impl Into<Value>) -> Result<bool> {
        self.set(path, Slot::Constant, value)
    }

    fn set_flag(&self, path: &str, flag: NodeFlag, on: bool) -> Result<bool> {
        let node = self.resolve(path)?;
        if self.backend.flag(&node, flag)? == on {
            return Ok(false);
        }
        self.backend.set_flag(&node, flag, on)?;
        Ok(true)
    }

    pub fn mute(&self, path: &str, muted: bool) -> Result<bool> {
        self.set_flag(path, NodeFlag::Mute, muted)
    }

    /// Colour a frame/node as enabled in the editor.
    pub fn highlight(&self, path: &str, enabled: bool) -> Result<bool> {
        self.set_flag(path, NodeFlag::Highlight, enabled)
    }

    /// Connect `emitter`'s first output into `receptor`'s first input.
    pub fn link(&self, receptor: &str, emitter: &str) -> Result<bool> {
        let to = self.resolve(receptor)?;
        let from = self.resolve(emitter)?;
        if self.backend.is_linked(&from, 0, &to, 0)? {
            return Ok(false);
        }
        self.backend.link(&from, 0, &to, 0)?;
        Ok(true)
    }

    /// Plug the `True` or `False` branch of a feature router.
    pub fn route(&self, route: Route, feature: &str, enabled: bool) -> Result<bool> {
        let prefix = route.as_str();
        let branch = if enabled { "True" } else { "False" };
        self.link(
            &format!("{} {} Receptor", prefix, feature),
            &format!("{} {} {}", prefix, feature, branch),
        )
    }

    /// Highlight `label` and switch every listed router of `feature`.
    pub fn toggle_feature(
        &self,
        label: &str,
        feature: &str,
        routes: &[Route],
        enabled: bool,
    ) -> Result<bool> {
        let mut changed = self.highlight(label, enabled)?;
        for route in routes {
            changed |= self.route(*route, feature, enabled)?;
        }
        Ok(changed)
    }

    /// Replace one space separated element of the keyword node.
    pub fn set_keyword(&self, value: &str, element: usize) -> Result<bool> {
        let current = self.read(KEYWORD_NODE, Slot::Constant)?;
        let mut parts: Vec<String> = current
            .as_str()
            .unwrap_or_default()
            .split(' ')
            .map(str::to_string)
            .collect();
        if parts.len() <= element {
            parts.resize(element + 1, String::new());
        }
        parts[element] = value.to_string();
        self.set_constant(KEYWORD_NODE, Value::Text(parts.join(" ")))
    }

    pub fn keyword(&self) -> Result<String> {
        Ok(self
            .read(KEYWORD_NODE, Slot::Constant)?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    /// Assign a texture sub-graph to a texture node.
    pub fn set_texture(&self, path: &str, texture: &str) -> Result<bool> {
        self.set(path, Slot::Tree, Value::Text(texture_tree_name(texture)))
    }
}
