use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScatterError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Node not found: '{path}' in graph of '{entity}'")]
    NodeNotFound { entity: String, path: String },

    #[error("No graph engine attached to '{0}'")]
    EngineMissing(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Property error: {0}")]
    Property(String),

    #[error("Invalid value for '{property}': {message}")]
    InvalidValue { property: String, message: String },

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config_manager::ConfigError),
}

impl ScatterError {
    pub fn invalid_value(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            property: property.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScatterError>;
