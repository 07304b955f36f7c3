use thiserror::Error;

use scatter_core::ScatterError;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown property '{property}' on '{entity}'")]
    UnknownProperty { entity: String, property: String },

    #[error("Handler for '{property}' failed on '{entity}': {message}")]
    HandlerFailed {
        entity: String,
        property: String,
        message: String,
    },

    /// The entity was removed from the scene while a write was in flight.
    #[error("Entity '{0}' no longer exists")]
    StaleReference(String),

    #[error("Unknown synchronization channel: {0}")]
    UnknownChannel(String),

    #[error(transparent)]
    Engine(#[from] ScatterError),
}

impl DispatchError {
    pub fn is_unknown_property(&self) -> bool {
        matches!(self, DispatchError::UnknownProperty { .. })
    }
}

pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Rule table inconsistencies found while building the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Property '{name}' is registered more than once")]
    DuplicateProperty { name: String },

    #[error("Template '{template}' declares {arity} instances, allowed range is 1..={max}")]
    ArityOutOfRange {
        template: String,
        arity: usize,
        max: usize,
    },

    #[error("Template '{0}' has no X or XX placeholder")]
    MissingPlaceholder(String),
}
